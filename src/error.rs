//! Error types for Civic Assist.

/// Top-level error type for the assistant core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),

    #[error("Program catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Text service error: {0}")]
    Text(#[from] TextServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),
}

/// Profile store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed for profile {id}: {reason}")]
    WriteFailed { id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Program catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Program not found: {id}")]
    ProgramNotFound { id: String },

    #[error("Invalid application steps for program {program}: {reason}")]
    InvalidSteps { program: String, reason: String },
}

/// Summarizer/translator errors.
#[derive(Debug, thiserror::Error)]
pub enum TextServiceError {
    #[error("Text service {service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Profile field validation errors. Recovered locally with a corrective
/// re-prompt, never surfaced as a turn failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("\"{input}\" is not a whole number")]
    NotAnInteger { input: String },

    #[error("age {value} is outside the accepted range 1-150")]
    AgeOutOfRange { value: i64 },

    #[error("\"{input}\" is not a number")]
    NotANumber { input: String },

    #[error("income cannot be negative")]
    NegativeIncome,

    #[error("occupation cannot be empty")]
    EmptyOccupation,

    #[error("unknown profile field: {name}")]
    UnknownField { name: String },
}

/// Dialog state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No pending field to collect")]
    NoPendingField,
}

/// Result type alias for the assistant core.
pub type Result<T> = std::result::Result<T, Error>;
