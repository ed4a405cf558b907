//! LLM providers behind [`LlmClient`](crate::llm::LlmClient).

pub mod gemini;
pub mod mock;
pub mod openai;

pub use gemini::GeminiClient;
pub use mock::MockProvider;
pub use openai::OpenAiClient;

use crate::llm::LlmClient;
use mirai_core::config::LlmConfig;
use mirai_core::GenerationError;
use std::sync::Arc;

/// Build the configured provider, reading credentials from the environment.
///
/// A missing credential is a fatal initialization error.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, GenerationError> {
    create_client_with(config, |name| std::env::var(name).ok())
}

/// Like [`create_client`] with an explicit variable lookup.
pub fn create_client_with<F>(
    config: &LlmConfig,
    lookup: F,
) -> Result<Arc<dyn LlmClient>, GenerationError>
where
    F: Fn(&str) -> Option<String>,
{
    tracing::info!(
        "Creating LLM client: {} (model {})",
        config.provider,
        config.model
    );
    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "gemini" => Arc::new(GeminiClient::from_config(config, &lookup)?),
        "openai" => Arc::new(OpenAiClient::from_config(config, &lookup)?),
        "mock" => Arc::new(MockProvider::new(&config.model)),
        other => {
            tracing::warn!("Unknown provider '{}', falling back to gemini", other);
            Arc::new(GeminiClient::from_config(config, &lookup)?)
        }
    };
    Ok(client)
}

/// First non-empty value among `names`.
fn credential<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|v| !v.trim().is_empty())
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GenerationError::Transport(e.to_string()))
}
