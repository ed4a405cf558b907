//! Core types for the Mirai character chat.
//!
//! Holds the persona (`Character`), chat turns (`Message`), the persisted
//! `Settings` aggregate with its store, application config, and the error
//! taxonomy every other crate reports through.

pub mod character;
pub mod config;
pub mod error;
pub mod message;
pub mod settings;
pub mod store;

pub use character::Character;
pub use config::MiraiConfig;
pub use error::{GenerationError, SettingsError, SynthesisError};
pub use message::{Message, MessageIds, Sender, APOLOGY_TEXT};
pub use settings::{Settings, TtsSettings};
pub use store::{FileBackend, MemoryBackend, SettingsBackend, SettingsStore, SETTINGS_KEY};
