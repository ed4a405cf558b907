pub mod api_types;
pub mod chat;
pub mod llm;
pub mod providers;
pub mod retry;

pub use chat::PersonaChat;
pub use llm::{LlmClient, ReplyGenerator};
