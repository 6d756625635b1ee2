//! Dialog state machine: sessions, per-turn routing, and responses.

pub mod engine;
pub mod prompts;
pub mod response;
pub mod state;

pub use engine::DialogEngine;
pub use response::Response;
pub use state::{ConversationMessage, DialogState, Role, SessionState};
