use async_trait::async_trait;
use mirai_core::SynthesisError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Plays encoded audio (whatever the remote TTS API returned).
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> Result<(), SynthesisError>;
}

/// Pipes audio into an external player reading from stdin.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Player arguments for the common stdin-capable players.
    pub fn for_program(program: &str) -> Self {
        let args: &[&str] = match program {
            "ffplay" => &["-nodisp", "-autoexit", "-loglevel", "quiet", "-"],
            "mpv" => &["--no-video", "--really-quiet", "-"],
            "paplay" | "aplay" => &[],
            _ => &["-"],
        };
        Self::new(program, args.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, audio: Vec<u8>) -> Result<(), SynthesisError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::Unsupported(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&audio)
                .await
                .map_err(|e| SynthesisError::Device(format!("{}: {}", self.program, e)))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| SynthesisError::Device(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(SynthesisError::Device(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Discards audio. Used when output is muted.
#[derive(Debug, Default)]
pub struct SilentPlayer;

#[async_trait]
impl AudioPlayer for SilentPlayer {
    async fn play(&self, audio: Vec<u8>) -> Result<(), SynthesisError> {
        tracing::debug!("Muted: dropping {} bytes of audio", audio.len());
        Ok(())
    }
}
