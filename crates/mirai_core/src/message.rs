use crate::character::Character;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Shown in place of a reply when the backend fails.
pub const APOLOGY_TEXT: &str = "エラーが発生しました。しばらくしてからもう一度お試しください。";

/// Id of the synthetic greeting that opens every conversation.
pub const GREETING_ID: &str = "init";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Character,
}

/// One turn of the conversation. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn greeting(character: &Character) -> Self {
        Self {
            id: GREETING_ID.to_string(),
            text: character.greeting(),
            sender: Sender::Character,
        }
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Issues `<prefix>-<n>` ids from a monotonically increasing counter.
#[derive(Debug, Default)]
pub struct MessageIds {
    next: AtomicU64,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", prefix, n)
    }

    pub fn user(&self, text: impl Into<String>) -> Message {
        Message {
            id: self.next_id("user"),
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn character(&self, text: impl Into<String>) -> Message {
        Message {
            id: self.next_id("char"),
            text: text.into(),
            sender: Sender::Character,
        }
    }

    pub fn apology(&self) -> Message {
        Message {
            id: self.next_id("error"),
            text: APOLOGY_TEXT.to_string(),
            sender: Sender::Character,
        }
    }
}
