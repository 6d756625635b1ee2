//! Civic Assist: conversational eligibility assistant core.

pub mod catalog;
pub mod config;
pub mod dialog;
pub mod eligibility;
pub mod error;
pub mod intent;
pub mod profile;
pub mod rules;
pub mod store;
pub mod text;
