//! REPL input parsing. Everything here is pure; `main` performs the effects.

use mirai_core::{Settings, SettingsError, TtsSettings};

pub const HELP: &str = "\
Commands:
  /name <name>              rename the character
  /avatar <url>             set the avatar URL
  /persona <text>           set the system instruction
  /tts local                speak with the local voice
  /tts remote <url> [key]   speak through a remote synthesis endpoint
  /settings                 show the current settings
  /clear                    start a new conversation
  /reset                    restore default settings
  /help                     show this help
  /quit                     exit
Anything else is sent to the character.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Edit(SettingsEdit),
    ShowSettings,
    Clear,
    ResetSettings,
    Help,
    Quit,
    /// Unparseable command; carries the message for the user.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEdit {
    Name(String),
    Avatar(String),
    Persona(String),
    Tts(TtsSettings),
}

impl SettingsEdit {
    /// The settings after this edit, rejected if they would not validate.
    pub fn apply(&self, settings: &Settings) -> Result<Settings, SettingsError> {
        let character = &settings.character;
        let next = match self {
            Self::Name(name) => settings.with_character(character.with_name(name)),
            Self::Avatar(url) => settings.with_character(character.with_avatar_url(url)),
            Self::Persona(text) => {
                settings.with_character(character.with_system_instruction(text))
            }
            Self::Tts(tts) => settings.with_tts(tts.clone()),
        };
        next.validate()?;
        Ok(next)
    }
}

pub fn parse(line: &str) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "name" => required(arg, "/name <name>", |a| SettingsEdit::Name(a.to_string())),
        "avatar" => required(arg, "/avatar <url>", |a| SettingsEdit::Avatar(a.to_string())),
        "persona" => required(arg, "/persona <text>", |a| {
            SettingsEdit::Persona(a.to_string())
        }),
        "tts" => parse_tts(arg),
        "settings" => Command::ShowSettings,
        "clear" => Command::Clear,
        "reset" => Command::ResetSettings,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("Unknown command /{}, try /help", other)),
    }
}

fn required(arg: &str, usage: &str, edit: impl FnOnce(&str) -> SettingsEdit) -> Command {
    if arg.is_empty() {
        Command::Invalid(format!("Usage: {}", usage))
    } else {
        Command::Edit(edit(arg))
    }
}

fn parse_tts(arg: &str) -> Command {
    let mut words = arg.split_whitespace();
    match (words.next(), words.next(), words.next(), words.next()) {
        (Some("local"), None, _, _) => Command::Edit(SettingsEdit::Tts(TtsSettings::Local)),
        (Some("remote"), Some(url), key, None) => Command::Edit(SettingsEdit::Tts(
            TtsSettings::remote(url, key.map(str::to_string)),
        )),
        _ => Command::Invalid("Usage: /tts local | /tts remote <url> [key]".to_string()),
    }
}
