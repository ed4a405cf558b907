use mirai_core::{Message, MessageIds, Settings, TtsSettings};
use mirai_reasoning::ReplyGenerator;
use mirai_voice::{SpeechSynthesizer, TtsFactory};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// What happened to a `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A user turn was appended and its reply pipeline started.
    Accepted,
    /// Blank input; nothing changed.
    Empty,
    /// A reply is already in flight; the message was dropped.
    Busy,
}

/// Read-only view published to the UI after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub is_busy: bool,
}

/// The single active conversation.
///
/// Two states: idle, and awaiting a reply (`is_busy`). At most one reply
/// pipeline runs at a time; sends while busy are dropped. Changing the
/// character cancels the in-flight pipeline and restarts the log with a
/// greeting, so a reply meant for the old persona can never show up.
#[derive(Clone)]
pub struct ConversationSession {
    inner: Arc<Inner>,
}

struct Inner {
    generator: Arc<dyn ReplyGenerator>,
    tts: Arc<TtsFactory>,
    ids: MessageIds,
    state: Mutex<State>,
    snapshot: watch::Sender<SessionSnapshot>,
}

struct State {
    settings: Settings,
    messages: Vec<Message>,
    busy: bool,
    /// Bumped by every accepted turn and every reset. A pipeline may only
    /// touch the log while its generation is still current.
    generation: u64,
    in_flight: Option<AbortHandle>,
}

/// Everything a pipeline needs, captured when the user turn is accepted.
struct PendingTurn {
    generation: u64,
    text: String,
    instruction: String,
    tts: TtsSettings,
}

impl ConversationSession {
    pub fn new(
        settings: Settings,
        generator: Arc<dyn ReplyGenerator>,
        tts: Arc<TtsFactory>,
    ) -> Self {
        let messages = vec![Message::greeting(&settings.character)];
        let (snapshot, _) = watch::channel(SessionSnapshot {
            messages: messages.clone(),
            is_busy: false,
        });
        Self {
            inner: Arc::new(Inner {
                generator,
                tts,
                ids: MessageIds::new(),
                state: Mutex::new(State {
                    settings,
                    messages,
                    busy: false,
                    generation: 0,
                    in_flight: None,
                }),
                snapshot,
            }),
        }
    }

    /// Append the user turn and run the reply pipeline in the background.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn send_message(&self, text: &str) -> SendOutcome {
        match self.start_turn(text) {
            Ok(_) => SendOutcome::Accepted,
            Err(outcome) => outcome,
        }
    }

    /// Like [`send_message`](Self::send_message), but resolves once the turn
    /// has completed or been cancelled by a reset.
    pub async fn submit(&self, text: &str) -> SendOutcome {
        match self.start_turn(text) {
            Ok(pipeline) => {
                if let Err(e) = pipeline.await {
                    if e.is_cancelled() {
                        tracing::debug!("Turn cancelled by a reset");
                    } else {
                        tracing::error!("Reply pipeline failed: {}", e);
                    }
                }
                SendOutcome::Accepted
            }
            Err(outcome) => outcome,
        }
    }

    fn start_turn(&self, text: &str) -> Result<JoinHandle<()>, SendOutcome> {
        let mut state = self.inner.state();
        let turn = self.inner.begin_turn(&mut state, text)?;
        let inner = self.inner.clone();
        // Spawned under the lock: a reset can never miss the handle.
        let pipeline = tokio::spawn(async move { inner.run_turn(turn).await });
        state.in_flight = Some(pipeline.abort_handle());
        self.inner.publish(&state);
        Ok(pipeline)
    }

    /// Take new settings. A different character resets the conversation;
    /// TTS changes take effect from the next reply.
    pub fn apply_settings(&self, settings: Settings) {
        let mut state = self.inner.state();
        let character_changed = state.settings.character != settings.character;
        let tts_changed = state.settings.tts_settings != settings.tts_settings;
        state.settings = settings;

        if character_changed {
            tracing::info!(
                "Character changed to {}, resetting conversation",
                state.settings.character.name
            );
            self.inner.reset_locked(&mut state);
            self.inner.publish(&state);
        } else if tts_changed {
            tracing::info!("TTS settings changed, effective from the next reply");
        }
    }

    /// Restart the conversation with the current character's greeting.
    pub fn reset(&self) {
        let mut state = self.inner.state();
        self.inner.reset_locked(&mut state);
        self.inner.publish(&state);
    }

    /// Apply every settings change published on `settings`.
    pub fn follow(&self, mut settings: watch::Receiver<Settings>) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let current = settings.borrow_and_update().clone();
            session.apply_settings(current);
            while settings.changed().await.is_ok() {
                let latest = settings.borrow_and_update().clone();
                session.apply_settings(latest);
            }
        })
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state().messages.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state().busy
    }

    pub fn settings(&self) -> Settings {
        self.inner.state().settings.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &State) {
        self.snapshot.send_replace(SessionSnapshot {
            messages: state.messages.clone(),
            is_busy: state.busy,
        });
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state().generation == generation
    }

    fn begin_turn(&self, state: &mut State, text: &str) -> Result<PendingTurn, SendOutcome> {
        if text.trim().is_empty() {
            return Err(SendOutcome::Empty);
        }
        if state.busy {
            tracing::debug!("Reply in flight, dropping message");
            return Err(SendOutcome::Busy);
        }

        state.generation += 1;
        state.busy = true;
        state.messages.push(self.ids.user(text));
        Ok(PendingTurn {
            generation: state.generation,
            text: text.to_string(),
            instruction: state.settings.character.system_instruction.clone(),
            tts: state.settings.tts_settings.clone(),
        })
    }

    async fn run_turn(&self, turn: PendingTurn) {
        let message = match self
            .generator
            .generate_reply(&turn.text, &turn.instruction)
            .await
        {
            Ok(reply) => {
                if !self.is_current(turn.generation) {
                    tracing::debug!("Conversation was reset, dropping reply");
                    return;
                }
                let speech = self.tts.service_for(&turn.tts);
                if let Err(e) = speech.speak(&reply).await {
                    tracing::warn!(
                        "Speech synthesis ({}) failed, showing text only: {}",
                        speech.provider_name(),
                        e
                    );
                }
                self.ids.character(reply)
            }
            Err(e) => {
                tracing::error!("Failed to get a reply: {}", e);
                self.ids.apology()
            }
        };
        self.finish_turn(turn.generation, message);
    }

    fn finish_turn(&self, generation: u64, message: Message) {
        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("Conversation was reset, dropping {}", message.id);
            return;
        }
        state.messages.push(message);
        state.busy = false;
        state.in_flight = None;
        self.publish(&state);
    }

    fn reset_locked(&self, state: &mut State) {
        if let Some(handle) = state.in_flight.take() {
            tracing::info!("Cancelling in-flight reply");
            handle.abort();
        }
        state.generation += 1;
        state.busy = false;
        state.messages = vec![Message::greeting(&state.settings.character)];
    }
}
