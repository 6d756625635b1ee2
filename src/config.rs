//! Configuration types.

use std::time::Duration;

use crate::profile::ProfileField;

/// Assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Minimum classifier confidence to accept an intent without asking
    /// the user to clarify.
    pub confidence_threshold: f32,
    /// Session idle timeout (sessions are recreated after this duration
    /// of inactivity).
    pub session_idle_timeout: Duration,
    /// Language code responses are authored in before translation.
    pub default_language: String,
    /// Profile fields collected before any query is routed.
    pub required_fields: Vec<ProfileField>,
    /// Maximum conversation messages retained per session.
    pub max_history_messages: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            session_idle_timeout: Duration::from_secs(1800), // 30 minutes
            default_language: "en".to_string(),
            required_fields: vec![
                ProfileField::Age,
                ProfileField::Income,
                ProfileField::Occupation,
            ],
            max_history_messages: 100,
        }
    }
}
