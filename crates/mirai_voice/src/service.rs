use crate::device::{CommandDevice, SilentDevice, SpeechDevice};
use crate::local::LocalSpeech;
use crate::player::{AudioPlayer, CommandPlayer, SilentPlayer};
use crate::remote::RemoteSpeech;
use crate::SpeechSynthesizer;
use anyhow::Result;
use async_trait::async_trait;
use mirai_core::config::VoiceConfig;
use mirai_core::{SynthesisError, TtsSettings};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// The synthesizer in effect for one `speak`.
pub enum SpeechService {
    Local(Arc<LocalSpeech>),
    Remote(RemoteSpeech),
}

#[async_trait]
impl SpeechSynthesizer for SpeechService {
    async fn speak(&self, text: &str) -> Result<(), SynthesisError> {
        match self {
            Self::Local(local) => local.speak(text).await,
            Self::Remote(remote) => remote.speak(text).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Local(local) => local.provider_name(),
            Self::Remote(remote) => remote.provider_name(),
        }
    }
}

/// Builds the synthesizer matching a [`TtsSettings`].
///
/// Holds the single process-wide [`LocalSpeech`] so voice discovery runs
/// once; remote synthesizers carry no warm-up state and are built per call.
pub struct TtsFactory {
    local: Arc<LocalSpeech>,
    player: Arc<dyn AudioPlayer>,
    client: Client,
    min_latency: Duration,
}

impl TtsFactory {
    pub fn new(local: Arc<LocalSpeech>, player: Arc<dyn AudioPlayer>, client: Client) -> Self {
        Self {
            local,
            player,
            client,
            min_latency: Duration::ZERO,
        }
    }

    /// Factory backed by the configured command line engine and player.
    /// `mute` swaps both for ones that produce no sound.
    pub fn from_config(config: &VoiceConfig, mute: bool) -> Result<Self> {
        let (device, player): (Arc<dyn SpeechDevice>, Arc<dyn AudioPlayer>) = if mute {
            tracing::info!("Audio muted");
            (Arc::new(SilentDevice), Arc::new(SilentPlayer))
        } else {
            tracing::info!(
                "Using speech engine '{}' and player '{}'",
                config.engine,
                config.player
            );
            (
                Arc::new(CommandDevice::new(&config.engine)),
                Arc::new(CommandPlayer::for_program(&config.player)),
            )
        };
        let local = Arc::new(LocalSpeech::new(device, &config.language));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.remote_timeout_secs))
            .build()?;

        Ok(Self::new(local, player, client)
            .with_min_latency(Duration::from_millis(config.remote_min_latency_ms)))
    }

    pub fn with_min_latency(mut self, floor: Duration) -> Self {
        self.min_latency = floor;
        self
    }

    pub fn service_for(&self, settings: &TtsSettings) -> SpeechService {
        match settings {
            TtsSettings::Local => SpeechService::Local(self.local.clone()),
            TtsSettings::Remote { api_url, api_key } => SpeechService::Remote(
                RemoteSpeech::new(
                    self.client.clone(),
                    api_url.clone(),
                    api_key.clone(),
                    self.player.clone(),
                    self.local.clone(),
                )
                .with_min_latency(self.min_latency),
            ),
        }
    }
}
