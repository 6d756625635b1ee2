//! The per-turn response returned to the interaction surface.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::state::DialogState;
use crate::profile::ProfileField;

/// Rendered output of one turn. Constructed fresh per turn, returned to
/// the caller, not retained by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Rendered text, already translated where applicable.
    pub text: String,
    /// The caller must supply further input before progress is possible.
    pub needs_input: bool,
    /// Suggested next actions for the caller to offer.
    pub suggested_actions: Vec<String>,
    /// Open key/value bag: always carries `state`, plus `pending_field`,
    /// `program_id`, `disclaimer` and service-degradation flags when
    /// applicable. Enough for the caller to render prompts without
    /// re-deriving state machine internals.
    pub metadata: serde_json::Value,
}

impl Response {
    pub fn new(text: impl Into<String>, state: DialogState) -> Self {
        Self {
            text: text.into(),
            needs_input: false,
            suggested_actions: Vec::new(),
            metadata: json!({ "state": state.to_string() }),
        }
    }

    pub fn needs_input(mut self) -> Self {
        self.needs_input = true;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_actions.push(action.into());
        self
    }

    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(bag) = self.metadata.as_object_mut() {
            bag.insert(key.to_string(), value);
        }
        self
    }

    pub fn with_pending_field(self, field: ProfileField) -> Self {
        self.with_meta("pending_field", json!(field.key()))
    }

    /// Tag the response for a disclaimer to be appended downstream.
    /// Rendering the disclaimer text is not the state machine's job.
    pub fn with_disclaimer(self) -> Self {
        self.with_meta("disclaimer", json!(true))
    }

    /// Read a metadata key back (for callers and tests).
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_carries_state_and_pending_field() {
        let response = Response::new("What is your age?", DialogState::CollectingProfile)
            .needs_input()
            .with_pending_field(ProfileField::Age);
        assert_eq!(response.meta("state").unwrap(), "collecting_profile");
        assert_eq!(response.meta("pending_field").unwrap(), "age");
        assert!(response.needs_input);
    }

    #[test]
    fn disclaimer_flag_is_set_not_rendered() {
        let response = Response::new("You appear to be eligible.", DialogState::Ready)
            .with_disclaimer();
        assert_eq!(response.meta("disclaimer").unwrap(), &json!(true));
        assert!(!response.text.to_lowercase().contains("disclaimer"));
    }

    #[test]
    fn actions_accumulate_in_order() {
        let response = Response::new("Sorry.", DialogState::Ready)
            .with_action("retry")
            .with_action("rephrase");
        assert_eq!(response.suggested_actions, vec!["retry", "rephrase"]);
    }
}
