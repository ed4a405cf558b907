use crate::api_types::Turn;
use async_trait::async_trait;
use mirai_core::GenerationError;

/// Provider seam: one stateless completion over an explicit history.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// `history` ends with the user turn to answer.
    async fn complete(&self, system: &str, history: &[Turn]) -> Result<String, GenerationError>;

    fn provider_name(&self) -> &'static str;
}

/// What the conversation session talks to.
///
/// Implementations keep backend context for as long as `persona_instruction`
/// stays the same and start over when it changes.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(
        &self,
        user_text: &str,
        persona_instruction: &str,
    ) -> Result<String, GenerationError>;
}
