use crate::character::Character;
use crate::error::SettingsError;
use serde::{Deserialize, Serialize};

/// Which speech synthesis strategy is active.
///
/// The wire tags (`browser` / `external`) are kept from the persisted
/// settings format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TtsSettings {
    /// Synthesis on the local speech device.
    #[default]
    #[serde(rename = "browser")]
    Local,
    /// Synthesis through an HTTP endpoint, falling back to `Local`.
    #[serde(rename = "external", rename_all = "camelCase")]
    Remote {
        api_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
}

impl TtsSettings {
    pub fn remote(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::Remote {
            api_url: api_url.into(),
            api_key,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// A remote configuration without a URL behaves like `Local`; persist it as such.
    pub fn normalized(self) -> Self {
        match self {
            Self::Remote { api_url, .. } if api_url.trim().is_empty() => Self::Local,
            other => other,
        }
    }
}

/// The single persisted aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub character: Character,
    pub tts_settings: TtsSettings,
}

impl Settings {
    pub fn new(character: Character, tts_settings: TtsSettings) -> Self {
        Self {
            character,
            tts_settings,
        }
    }

    /// Parse and validate a persisted payload.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.character.validate()
    }

    pub fn with_character(&self, character: Character) -> Self {
        Self {
            character,
            ..self.clone()
        }
    }

    pub fn with_tts(&self, tts_settings: TtsSettings) -> Self {
        Self {
            tts_settings,
            ..self.clone()
        }
    }
}
