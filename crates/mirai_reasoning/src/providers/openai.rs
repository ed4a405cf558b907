use crate::api_types::{Role, Turn};
use crate::llm::LlmClient;
use crate::retry::{with_retry, RetryConfig};
use mirai_core::config::LlmConfig;
use mirai_core::GenerationError;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config<F>(config: &LlmConfig, lookup: &F) -> Result<Self, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = super::credential(lookup, &["OPENAI_API_KEY"])
            .ok_or(GenerationError::MissingCredential("OPENAI_API_KEY"))?;
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Ok(
            Self::new(super::http_client(config.timeout_secs)?, api_key, base_url, &config.model)
                .with_retry(RetryConfig::default().with_max_attempts(config.max_attempts)),
        )
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn payload(&self, system: &str, history: &[Turn]) -> Value {
        // OpenAI puts the system prompt first, as a message with role "system"
        let mut messages = vec![json!({ "role": "system", "content": system })];
        for turn in history {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": turn.text }));
        }
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.7,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    #[tracing::instrument(skip(self, system, history), fields(model = %self.model))]
    async fn complete(&self, system: &str, history: &[Turn]) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = self.payload(system, history);

        let client = &self.client;
        let api_key = &self.api_key;
        let response = with_retry(&self.retry, "OpenAI", || {
            client.post(&url).bearer_auth(api_key).json(&payload).send()
        })
        .await?;

        let resp_json: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("OpenAI response: {}", e)))?;
        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        Ok(content.to_string())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_puts_system_first() {
        let client = OpenAiClient::new(Client::new(), "k", "http://x/", "gpt-4o-mini");
        let payload = client.payload("persona", &[Turn::user("hi"), Turn::assistant("yo")]);
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], "persona");
        assert_eq!(payload["messages"][2]["role"], "assistant");
        assert_eq!(client.base_url, "http://x");
    }
}
