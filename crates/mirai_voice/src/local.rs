use crate::device::{SpeechDevice, Utterance, Voice};
use crate::SpeechSynthesizer;
use async_trait::async_trait;
use mirai_core::SynthesisError;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Synthesis on the local speech device.
///
/// The voice list is awaited once per instance and the choice memoized, so
/// one `LocalSpeech` should be shared for the life of the process.
pub struct LocalSpeech {
    device: Arc<dyn SpeechDevice>,
    language: String,
    voice: OnceCell<Option<Voice>>,
}

impl LocalSpeech {
    pub fn new(device: Arc<dyn SpeechDevice>, language: impl Into<String>) -> Self {
        Self {
            device,
            language: language.into(),
            voice: OnceCell::new(),
        }
    }

    /// The voice used for every utterance; `None` means the device default.
    pub async fn voice(&self) -> Option<Voice> {
        self.voice
            .get_or_init(|| async {
                match self.device.voices().await {
                    Ok(voices) => {
                        let voice = select_voice(&voices, &self.language);
                        match &voice {
                            Some(v) => tracing::info!(
                                "Using {} voice '{}' ({})",
                                self.language,
                                v.name,
                                v.id
                            ),
                            None => tracing::warn!(
                                "No {} voice among {} device voices, using the default voice",
                                self.language,
                                voices.len()
                            ),
                        }
                        voice
                    }
                    Err(e) => {
                        tracing::warn!("Voice discovery failed ({}), using the default voice", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for LocalSpeech {
    async fn speak(&self, text: &str) -> Result<(), SynthesisError> {
        let voice = self.voice().await;
        // One utterance at a time: a new one preempts the old.
        self.device.cancel();
        self.device
            .utter(Utterance {
                text: text.to_string(),
                voice,
            })
            .await
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Exact tag match first, then a voice tagged with just the primary subtag.
fn select_voice(voices: &[Voice], language: &str) -> Option<Voice> {
    let wanted = normalize_tag(language);
    let primary = wanted.split('-').next().unwrap_or_default().to_string();

    voices
        .iter()
        .find(|v| normalize_tag(&v.language) == wanted)
        .or_else(|| {
            voices
                .iter()
                .find(|v| !primary.is_empty() && normalize_tag(&v.language) == primary)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("en-us", "English", "en-US"),
            Voice::new("ja", "Japanese", "ja"),
            Voice::new("kyoko", "Kyoko", "ja_JP"),
        ]
    }

    #[test]
    fn test_exact_match_wins() {
        let v = select_voice(&voices(), "ja-JP").unwrap();
        assert_eq!(v.id, "kyoko");
    }

    #[test]
    fn test_primary_subtag_fallback() {
        let v = select_voice(&voices()[..2], "ja-JP").unwrap();
        assert_eq!(v.id, "ja");
    }

    #[test]
    fn test_no_match() {
        assert!(select_voice(&voices(), "fr-FR").is_none());
        assert!(select_voice(&[], "ja-JP").is_none());
    }
}
