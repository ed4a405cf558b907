//! Turns session snapshots into terminal output.

use mirai_core::{Message, Sender};
use mirai_session::SessionSnapshot;

/// Remembers what has been printed so each snapshot only prints what is new.
#[derive(Debug, Default)]
pub struct Transcript {
    printed: Vec<Message>,
    was_busy: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for `snapshot`. A log that no longer extends what was
    /// printed means the conversation restarted.
    pub fn update(&mut self, snapshot: &SessionSnapshot, character_name: &str) -> Vec<String> {
        let mut lines = Vec::new();
        if !snapshot.messages.starts_with(&self.printed) {
            lines.push("--- new conversation ---".to_string());
            self.printed.clear();
        }
        for message in &snapshot.messages[self.printed.len()..] {
            lines.push(render(message, character_name));
        }
        self.printed = snapshot.messages.clone();

        if snapshot.is_busy && !self.was_busy {
            lines.push(format!("({} is thinking...)", character_name));
        }
        self.was_busy = snapshot.is_busy;
        lines
    }
}

fn render(message: &Message, character_name: &str) -> String {
    match message.sender {
        Sender::User => format!("you> {}", message.text),
        Sender::Character => format!("{}> {}", character_name, message.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirai_core::{Character, MessageIds};

    fn snapshot(messages: Vec<Message>, is_busy: bool) -> SessionSnapshot {
        SessionSnapshot { messages, is_busy }
    }

    #[test]
    fn test_prints_only_new_messages() {
        let ids = MessageIds::new();
        let greeting = Message::greeting(&Character::default().with_name("Mirai"));
        let hello = ids.user("Hello");
        let reply = ids.character("Hi there");
        let mut transcript = Transcript::new();

        let lines = transcript.update(&snapshot(vec![greeting.clone()], false), "Mirai");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Mirai> "));

        let lines = transcript.update(&snapshot(vec![greeting.clone(), hello.clone()], true), "Mirai");
        assert_eq!(lines, vec!["you> Hello", "(Mirai is thinking...)"]);

        let lines = transcript.update(&snapshot(vec![greeting, hello, reply], false), "Mirai");
        assert_eq!(lines, vec!["Mirai> Hi there"]);
    }

    #[test]
    fn test_restart_reprints_greeting() {
        let ids = MessageIds::new();
        let mirai = Message::greeting(&Character::default().with_name("Mirai"));
        let hikari = Message::greeting(&Character::default().with_name("Hikari"));
        let mut transcript = Transcript::new();

        transcript.update(&snapshot(vec![mirai.clone(), ids.user("a")], true), "Mirai");
        let lines = transcript.update(&snapshot(vec![hikari], false), "Hikari");

        assert_eq!(lines[0], "--- new conversation ---");
        assert!(lines[1].starts_with("Hikari> "));
        assert!(lines[1].contains("Hikari"));
    }
}
