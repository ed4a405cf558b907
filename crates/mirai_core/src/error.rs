use thiserror::Error;

/// Malformed or unreadable persisted settings.
///
/// Always recovered inside the store by falling back to defaults.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Validation(String),
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("settings backend failed: {0}")]
    Backend(String),
}

/// Any failure of the reply backend.
///
/// Callers only need to know that generation failed; the variants exist for
/// diagnostics in logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("backend returned an empty reply")]
    EmptyReply,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Speech synthesis failure. Never fatal to a conversation turn.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("speech synthesis unsupported: {0}")]
    Unsupported(String),
    #[error("speech device error: {0}")]
    Device(String),
    #[error("remote synthesis failed: {0}")]
    Remote(String),
    #[error("utterance was cancelled")]
    Cancelled,
}
