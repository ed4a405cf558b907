//! The conversation session: one ordered message log, a busy flag, and the
//! generate -> speak -> append pipeline for each user turn.

mod session;

pub use session::{ConversationSession, SendOutcome, SessionSnapshot};
