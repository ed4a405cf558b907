use crate::api_types::{GeminiContent, GenerateContentRequest, GenerateContentResponse, Role, Turn};
use crate::llm::LlmClient;
use crate::retry::{with_retry, RetryConfig};
use mirai_core::config::LlmConfig;
use mirai_core::GenerationError;
use reqwest::Client;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent` REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl GeminiClient {
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

    /// Key from `GEMINI_API_KEY`, else `API_KEY`.
    pub fn from_config<F>(config: &LlmConfig, lookup: &F) -> Result<Self, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = super::credential(lookup, &["GEMINI_API_KEY", "API_KEY"])
            .ok_or(GenerationError::MissingCredential("GEMINI_API_KEY"))?;
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

    fn request_body(system: &str, history: &[Turn]) -> GenerateContentRequest {
        let contents = history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                GeminiContent::text(Some(role), &turn.text)
            })
            .collect();
        GenerateContentRequest {
            system_instruction: (!system.is_empty()).then(|| GeminiContent::text(None, system)),
            contents,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    #[tracing::instrument(skip(self, system, history), fields(model = %self.model))]
    async fn complete(&self, system: &str, history: &[Turn]) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = Self::request_body(system, history);
        tracing::debug!("Gemini request with {} turns", body.contents.len());

        let client = &self.client;
        let api_key = &self.api_key;
        let response = with_retry(&self.retry, "Gemini", || {
            client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
        })
        .await?;

        let resp_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&resp_text)
            .map_err(|e| GenerationError::Malformed(format!("Gemini response: {}", e)))?;

        match parsed.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerationError::EmptyReply),
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_roles() {
        let body = GeminiClient::request_body(
            "persona",
            &[Turn::user("hi"), Turn::assistant("hello"), Turn::user("bye")],
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "bye");
    }

    #[test]
    fn test_empty_system_is_omitted() {
        let json = serde_json::to_value(GeminiClient::request_body("", &[Turn::user("x")])).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }
}
