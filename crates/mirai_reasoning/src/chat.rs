//! Persona-scoped chat sessions.
//!
//! The backend keeps no state of its own; continuity is the history kept
//! here. A session lives exactly as long as the persona instruction string
//! it was opened with: any difference, even whitespace, opens a new one.

use crate::api_types::Turn;
use crate::llm::{LlmClient, ReplyGenerator};
use async_trait::async_trait;
use mirai_core::GenerationError;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ChatSession {
    instruction: String,
    history: Vec<Turn>,
}

impl ChatSession {
    fn new(instruction: &str) -> Self {
        Self {
            instruction: instruction.to_string(),
            history: Vec::new(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

pub struct PersonaChat {
    client: Arc<dyn LlmClient>,
    session: Mutex<Option<ChatSession>>,
}

impl PersonaChat {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            session: Mutex::new(None),
        }
    }

    /// Snapshot of the active session, if any.
    pub async fn session(&self) -> Option<ChatSession> {
        self.session.lock().await.clone()
    }
}

#[async_trait]
impl ReplyGenerator for PersonaChat {
    #[tracing::instrument(skip_all, fields(provider = self.client.provider_name()))]
    async fn generate_reply(
        &self,
        user_text: &str,
        persona_instruction: &str,
    ) -> Result<String, GenerationError> {
        // Held across the backend call: turns of one session never interleave.
        let mut guard = self.session.lock().await;
        let stale = guard
            .as_ref()
            .map_or(true, |s| s.instruction != persona_instruction);
        if stale {
            tracing::info!("Creating new chat session for a new system instruction");
            *guard = Some(ChatSession::new(persona_instruction));
        }
        let session = guard.get_or_insert_with(|| ChatSession::new(persona_instruction));

        let mut request = session.history.clone();
        request.push(Turn::user(user_text));

        let reply = self.client.complete(&session.instruction, &request).await?;
        if reply.trim().is_empty() {
            return Err(GenerationError::EmptyReply);
        }

        session.history.push(Turn::user(user_text));
        session.history.push(Turn::assistant(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::Role;
    use std::sync::Mutex as StdMutex;

    /// Records every request and answers from a script.
    struct ScriptedClient {
        replies: StdMutex<Vec<Result<String, GenerationError>>>,
        requests: StdMutex<Vec<(String, Vec<Turn>)>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(String, Vec<Turn>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, system: &str, history: &[Turn]) -> Result<String, GenerationError> {
            self.requests
                .lock()
                .unwrap()
                .push((system.to_string(), history.to_vec()));
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok("...".to_string())
            } else {
                replies.remove(0)
            }
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_same_instruction_keeps_history() {
        let client = ScriptedClient::new(vec![Ok("one".into()), Ok("two".into())]);
        let chat = PersonaChat::new(client.clone());

        assert_eq!(chat.generate_reply("hi", "be kind").await.unwrap(), "one");
        assert_eq!(chat.generate_reply("again", "be kind").await.unwrap(), "two");

        let requests = client.requests();
        assert_eq!(requests[0].1.len(), 1);
        assert_eq!(
            requests[1].1,
            vec![Turn::user("hi"), Turn::assistant("one"), Turn::user("again")]
        );
        assert_eq!(requests[1].0, "be kind");
    }

    #[tokio::test]
    async fn test_changed_instruction_starts_fresh() {
        let client = ScriptedClient::new(vec![Ok("one".into()), Ok("two".into())]);
        let chat = PersonaChat::new(client.clone());

        chat.generate_reply("hi", "be kind").await.unwrap();
        // Exact string comparison: trailing whitespace is a different persona
        chat.generate_reply("hi", "be kind ").await.unwrap();

        let requests = client.requests();
        assert_eq!(requests[1].0, "be kind ");
        assert_eq!(requests[1].1, vec![Turn::user("hi")]);

        let session = chat.session().await.unwrap();
        assert_eq!(session.instruction(), "be kind ");
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_history_untouched() {
        let client = ScriptedClient::new(vec![
            Ok("one".into()),
            Err(GenerationError::Transport("timeout".into())),
            Ok("three".into()),
        ]);
        let chat = PersonaChat::new(client.clone());

        chat.generate_reply("a", "p").await.unwrap();
        assert!(chat.generate_reply("b", "p").await.is_err());
        chat.generate_reply("c", "p").await.unwrap();

        let last = client.requests().pop().unwrap().1;
        let roles: Vec<Role> = last.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(last[2].text, "c");
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let client = ScriptedClient::new(vec![Ok("  \n".into())]);
        let chat = PersonaChat::new(client);
        assert_eq!(
            chat.generate_reply("a", "p").await,
            Err(GenerationError::EmptyReply)
        );
        assert!(chat.session().await.unwrap().history().is_empty());
    }
}
