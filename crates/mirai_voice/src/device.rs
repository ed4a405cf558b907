//! The host speech device: voice enumeration and utterance playback.

use async_trait::async_trait;
use mirai_core::SynthesisError;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;

/// Represents a text-to-speech voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Identifier passed back to the device when speaking.
    pub id: String,
    pub name: String,
    /// BCP-47-ish language tag as reported by the device.
    pub language: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }
}

/// One request to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    /// `None` means the device default voice.
    pub voice: Option<Voice>,
}

/// A speech engine on this machine.
#[async_trait]
pub trait SpeechDevice: Send + Sync {
    /// Suspends until the device has published its voice list.
    async fn voices(&self) -> Result<Vec<Voice>, SynthesisError>;

    /// Play one utterance, resolving when playback ends naturally.
    async fn utter(&self, utterance: Utterance) -> Result<(), SynthesisError>;

    /// Stop whatever is currently being spoken. The interrupted `utter`
    /// resolves with [`SynthesisError::Cancelled`].
    fn cancel(&self);
}

/// Drives an espeak-compatible command line synthesizer.
///
/// `<program> --voices` lists voices, `<program> [-v <id>] --stdin` speaks.
pub struct CommandDevice {
    program: String,
    next_id: AtomicU64,
    current: Mutex<Option<(u64, oneshot::Sender<()>)>>,
}

impl CommandDevice {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            next_id: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    fn take_current(&self) -> Option<(u64, oneshot::Sender<()>)> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn install(&self, id: u64, cancel: oneshot::Sender<()>) {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace((id, cancel));
        if let Some((_, tx)) = previous {
            let _ = tx.send(());
        }
    }

    fn release(&self, id: u64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(current.as_ref(), Some((owner, _)) if *owner == id) {
            current.take();
        }
    }
}

#[async_trait]
impl SpeechDevice for CommandDevice {
    async fn voices(&self) -> Result<Vec<Voice>, SynthesisError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .await
            .map_err(|e| SynthesisError::Unsupported(format!("{}: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(SynthesisError::Device(format!(
                "{} --voices failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(parse_espeak_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn utter(&self, utterance: Utterance) -> Result<(), SynthesisError> {
        let mut command = Command::new(&self.program);
        if let Some(voice) = &utterance.voice {
            command.arg("-v").arg(&voice.id);
        }
        let mut child = command
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::Unsupported(format!("{}: {}", self.program, e)))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.install(id, cancel_tx);

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(utterance.text.as_bytes()).await {
                self.release(id);
                return Err(SynthesisError::Device(e.to_string()));
            }
        }

        let result = tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(SynthesisError::Device(format!(
                    "{} exited with {}",
                    self.program, status
                ))),
                Err(e) => Err(SynthesisError::Device(e.to_string())),
            },
            _ = cancel_rx => {
                let _ = child.kill().await;
                Err(SynthesisError::Cancelled)
            }
        };
        self.release(id);
        result
    }

    fn cancel(&self) {
        if let Some((_, tx)) = self.take_current() {
            let _ = tx.send(());
        }
    }
}

/// A device that speaks nothing. Used when audio is muted.
#[derive(Debug, Default)]
pub struct SilentDevice;

#[async_trait]
impl SpeechDevice for SilentDevice {
    async fn voices(&self) -> Result<Vec<Voice>, SynthesisError> {
        Ok(Vec::new())
    }

    async fn utter(&self, utterance: Utterance) -> Result<(), SynthesisError> {
        tracing::debug!("Muted: {}", utterance.text);
        Ok(())
    }

    fn cancel(&self) {}
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
/// ```
pub fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [_pty, language, _age_gender, name, ..] => {
                    Some(Voice::new(*language, *name, *language))
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-us           --/M      English_(America)  gmw/en-US            (en 2)(en-r 5)
 5  ja              --/M      Japanese           jpx/ja
";

    #[test]
    fn test_parse_espeak_voices() {
        let voices = parse_espeak_voices(SAMPLE);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1], Voice::new("en-us", "English_(America)", "en-us"));
        assert_eq!(voices[2].language, "ja");
    }

    #[test]
    fn test_parse_ignores_garbage() {
        assert!(parse_espeak_voices("").is_empty());
        assert!(parse_espeak_voices("Pty Language\n\n  x y\n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_unsupported() {
        let device = CommandDevice::new("/nonexistent/mirai-speech-engine");
        let err = device.voices().await.unwrap_err();
        assert!(matches!(err, SynthesisError::Unsupported(_)));

        let err = device
            .utter(Utterance {
                text: "hello".into(),
                voice: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Unsupported(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_write_releases_cancel_slot() {
        // `true` exits without reading, so a write larger than the pipe
        // buffer fails with a broken pipe.
        let device = CommandDevice::new("true");
        let err = device
            .utter(Utterance {
                text: "a".repeat(1 << 20),
                voice: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Device(_)));
        assert!(device.take_current().is_none());
    }

    #[tokio::test]
    async fn test_silent_device() {
        let device = SilentDevice;
        assert!(device.voices().await.unwrap().is_empty());
        assert!(device
            .utter(Utterance {
                text: "shh".into(),
                voice: None,
            })
            .await
            .is_ok());
    }
}
