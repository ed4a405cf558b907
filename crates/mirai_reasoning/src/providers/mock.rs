//! Mock LLM provider: deterministic replies for running without API keys.

use crate::api_types::{Role, Turn};
use crate::llm::LlmClient;
use mirai_core::GenerationError;

#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(&self, _system: &str, history: &[Turn]) -> Result<String, GenerationError> {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        let last = history
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        Ok(format!(
            "(Mock {} Response) You said: {} (turn {})",
            self.model,
            last,
            history.len().div_ceil(2)
        ))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_mock_complete() {
        let provider = MockProvider::new("test-model");
        let reply = provider
            .complete("system", &[Turn::user("hello")])
            .await
            .unwrap();
        assert!(reply.contains("Mock"));
        assert!(reply.contains("test-model"));
        assert!(reply.contains("hello"));
        assert!(reply.contains("turn 1"));
    }
}
