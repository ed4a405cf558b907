//! Voice module for Mirai
//!
//! Speech synthesis behind one capability, [`SpeechSynthesizer`], with two
//! variants picked from [`mirai_core::TtsSettings`]: the local speech device
//! and a remote HTTP API that falls back to the local device.

mod device;
mod local;
mod player;
mod remote;
mod service;

pub use device::{parse_espeak_voices, CommandDevice, SilentDevice, SpeechDevice, Utterance, Voice};
pub use local::LocalSpeech;
pub use player::{AudioPlayer, CommandPlayer, SilentPlayer};
pub use remote::RemoteSpeech;
pub use service::{SpeechService, TtsFactory};

use async_trait::async_trait;
use mirai_core::SynthesisError;

/// Turns text into played audio.
///
/// `speak` suspends until playback has finished (or failed).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SynthesisError>;

    /// Get the name of this TTS provider
    fn provider_name(&self) -> &'static str;
}
