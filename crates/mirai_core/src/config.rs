use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

/// Deployment configuration. Unlike [`crate::Settings`], this is not edited
/// from the chat UI; it picks the reply backend and the speech devices.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MiraiConfig {
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
    pub storage: StorageConfig,
}

impl MiraiConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: MiraiConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, use defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                Self::from_env()
            }
        }
    }

    /// Defaults plus env overrides.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("VOICE_LANGUAGE") {
            self.voice.language = v;
        }
        if let Ok(v) = std::env::var("VOICE_ENGINE") {
            self.voice.engine = v;
        }
        if let Ok(v) = std::env::var("MIRAI_SETTINGS_DIR") {
            self.storage.settings_dir = Some(PathBuf::from(v));
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `gemini`, `openai` or `mock`
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Attempts per reply, including the first.
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            timeout_secs: 60,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Language tag the local voice must match, e.g. `ja-JP`.
    pub language: String,
    /// espeak-compatible synthesis command.
    pub engine: String,
    /// Player fed with remote audio on stdin.
    pub player: String,
    pub remote_timeout_secs: u64,
    /// Lower bound on a remote `speak` call, in milliseconds.
    pub remote_min_latency_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "ja-JP".to_string(),
            engine: "espeak-ng".to_string(),
            player: "ffplay".to_string(),
            remote_timeout_secs: 30,
            remote_min_latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub settings_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, else `<config dir>/mirai`, else `./.mirai`.
    pub fn settings_dir(&self) -> PathBuf {
        self.settings_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .map(|d| d.join("mirai"))
                .unwrap_or_else(|| PathBuf::from(".mirai"))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = MiraiConfig::default();
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.model, "gemini-2.5-flash");
        assert_eq!(cfg.voice.language, "ja-JP");
        assert_eq!(cfg.voice.remote_min_latency_ms, 0);
        assert!(cfg.storage.settings_dir.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
"#;
        let cfg: MiraiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        // Defaults for unspecified fields
        assert_eq!(cfg.llm.max_attempts, 3);
        assert_eq!(cfg.voice.engine, "espeak-ng");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[llm]
provider = "gemini"
model = "gemini-2.0-flash"
base_url = "http://localhost:8080"
timeout_secs = 10
max_attempts = 1

[voice]
language = "en-US"
engine = "espeak"
player = "mpv"
remote_timeout_secs = 5
remote_min_latency_ms = 300

[storage]
settings_dir = "/tmp/mirai-settings"
"#;
        let cfg: MiraiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(cfg.llm.max_attempts, 1);
        assert_eq!(cfg.voice.language, "en-US");
        assert_eq!(cfg.voice.remote_min_latency_ms, 300);
        assert_eq!(
            cfg.storage.settings_dir(),
            PathBuf::from("/tmp/mirai-settings")
        );
    }

    #[test]
    fn test_missing_file_falls_back() {
        let cfg = MiraiConfig::load_or_default("/nonexistent/mirai.toml");
        assert_eq!(cfg.llm.timeout_secs, 60);
    }
}
