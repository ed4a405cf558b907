use crate::local::LocalSpeech;
use crate::player::AudioPlayer;
use crate::SpeechSynthesizer;
use async_trait::async_trait;
use mirai_core::SynthesisError;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Synthesis through an HTTP TTS endpoint.
///
/// `POST <api_url>` with `{"text": ...}` (and a bearer token when a key is
/// configured) must answer 2xx with the audio bytes. Any failure on that
/// path falls back to the shared local speech device.
pub struct RemoteSpeech {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    player: Arc<dyn AudioPlayer>,
    fallback: Arc<LocalSpeech>,
    min_latency: Duration,
}

impl RemoteSpeech {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        player: Arc<dyn AudioPlayer>,
        fallback: Arc<LocalSpeech>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
            player,
            fallback,
            min_latency: Duration::ZERO,
        }
    }

    /// Never resolve a remote `speak` faster than `floor`.
    pub fn with_min_latency(mut self, floor: Duration) -> Self {
        self.min_latency = floor;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn fetch_audio(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        if self.api_url.trim().is_empty() {
            return Err(SynthesisError::Remote("no API URL configured".into()));
        }
        tracing::debug!(
            "Requesting speech from {} (api key: {})",
            self.api_url,
            if self.api_key.is_some() { "yes" } else { "no" }
        );

        let mut request = self.client.post(&self.api_url).json(&json!({ "text": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SynthesisError::Remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Remote(format!(
                "{} returned {}: {}",
                self.api_url,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Remote(e.to_string()))?;
        if audio.is_empty() {
            return Err(SynthesisError::Remote("empty audio body".into()));
        }
        Ok(audio.to_vec())
    }

    async fn speak_remote(&self, text: &str) -> Result<(), SynthesisError> {
        let audio = self.fetch_audio(text).await?;
        self.player.play(audio).await
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteSpeech {
    async fn speak(&self, text: &str) -> Result<(), SynthesisError> {
        let started = Instant::now();
        let result = self.speak_remote(text).await;
        tokio::time::sleep_until(started + self.min_latency).await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Remote TTS failed ({}), falling back to local speech", e);
                self.fallback.speak(text).await
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "remote"
    }
}
