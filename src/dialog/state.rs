//! Dialog state machine: tracks where each session is in the conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DialogError;
use crate::intent::Intent;
use crate::profile::ProfileField;

/// The states a session moves through.
///
/// `New` → `CollectingProfile` → `Ready`, with transient detours to
/// `AwaitingClarification` and `AwaitingMissingField` that return to
/// `Ready`. `Error` is reachable from anywhere and always returns to the
/// state held before the failing turn. There is no terminal state: a
/// session persists until it expires or the user deletes their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    New,
    CollectingProfile,
    Ready,
    AwaitingClarification,
    AwaitingMissingField,
    Error,
}

impl DialogState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: DialogState) -> bool {
        use DialogState::*;
        // Error is reachable from any state and restores any state.
        if target == Error || *self == Error {
            return true;
        }
        matches!(
            (self, target),
            (New, CollectingProfile)
                | (New, Ready)
                | (CollectingProfile, Ready)
                | (Ready, AwaitingClarification)
                | (Ready, AwaitingMissingField)
                | (Ready, CollectingProfile)
                | (Ready, New)
                | (AwaitingClarification, Ready)
                | (AwaitingMissingField, Ready)
        )
    }
}

impl Default for DialogState {
    fn default() -> Self {
        Self::New
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::CollectingProfile => "collecting_profile",
            Self::Ready => "ready",
            Self::AwaitingClarification => "awaiting_clarification",
            Self::AwaitingMissingField => "awaiting_missing_field",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Who said a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-user conversational state carried across turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub user_id: String,
    pub state: DialogState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_intent: Option<Intent>,
    pub history: Vec<ConversationMessage>,
    /// Profile fields still pending collection, head first.
    pub pending_fields: Vec<ProfileField>,
    /// Program remembered across a missing-field detour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_program: Option<String>,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: DialogState::New,
            current_intent: None,
            history: Vec::new(),
            pending_fields: Vec::new(),
            pending_program: None,
            last_activity: Utc::now(),
        }
    }

    /// Transition to a new state, rejecting edges the machine does not have.
    pub fn transition_to(&mut self, target: DialogState) -> Result<(), DialogError> {
        if self.state == target {
            return Ok(());
        }
        if !self.state.can_transition_to(target) {
            return Err(DialogError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    /// Append a message, dropping the oldest entries past `cap`.
    pub fn record(&mut self, role: Role, content: &str, cap: usize) {
        self.history.push(ConversationMessage {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        if self.history.len() > cap {
            let drain = self.history.len() - cap;
            self.history.drain(..drain);
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether the session has been idle longer than `window`.
    pub fn is_expired(&self, window: std::time::Duration) -> bool {
        let idle = Utc::now().signed_duration_since(self.last_activity);
        idle.num_milliseconds().max(0) as u128 > window.as_millis()
    }
}
