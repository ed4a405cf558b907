use crate::error::SettingsError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME: &str = "ミライ";
pub const DEFAULT_AVATAR_URL: &str = "https://picsum.photos/seed/miraichan/100/100";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
あなたは「ミライ」という名前の、親しみやすく、少し未来的な知識を持つAIアシスタントです。\
ユーザーからの質問や会話に、日本語でフレンドリーに、そして少しユーモアを交えて応答してください。\
応答は常に簡潔に、2〜3文程度にまとめてください。";

/// The persona the reply backend is asked to emulate.
///
/// Treated as an immutable value: editing any field produces a new
/// `Character`, and a new character resets the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    /// Opaque resource locator, only ever displayed.
    pub avatar_url: String,
    /// Persona prompt handed to the reply backend.
    pub system_instruction: String,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            avatar_url: DEFAULT_AVATAR_URL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl Character {
    pub fn new(
        name: impl Into<String>,
        avatar_url: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            avatar_url: avatar_url.into(),
            system_instruction: system_instruction.into(),
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_avatar_url(&self, avatar_url: impl Into<String>) -> Self {
        Self {
            avatar_url: avatar_url.into(),
            ..self.clone()
        }
    }

    pub fn with_system_instruction(&self, instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: instruction.into(),
            ..self.clone()
        }
    }

    /// Opening line shown whenever a conversation starts with this character.
    pub fn greeting(&self) -> String {
        format!("こんにちは！{}です。何かお話ししましょう。", self.name)
    }

    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("name", &self.name),
            ("avatarUrl", &self.avatar_url),
            ("systemInstruction", &self.system_instruction),
        ] {
            if value.is_empty() {
                return Err(SettingsError::Validation(format!(
                    "character.{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}
