//! Error types for the onboarding wizard.

use crate::onboarding::state::WizardStep;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Answer error: {0}")]
    Answer(#[from] AnswerError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Answer store errors.
///
/// These indicate wiring mistakes between the host's option groups and the
/// step schemas. They are logged, never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("Category {category} does not belong to step {step}")]
    InvalidCategory { step: WizardStep, category: String },

    #[error("Empty value for category {category}")]
    EmptyValue { category: String },
}

/// Progress sync (backend) errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("No identity token available")]
    Unauthenticated,

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Server rejected request ({status}): {detail}")]
    ServerRejected { status: u16, detail: String },

    #[error("Server unavailable ({status})")]
    ServerUnavailable { status: u16 },
}

/// Wizard controller errors returned to the event source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Answer(#[from] AnswerError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Invalid step transition from {from} to {to}")]
    InvalidTransition { from: WizardStep, to: WizardStep },

    #[error("Session already ended")]
    SessionEnded,

    #[error("No async runtime to run the save on")]
    RuntimeUnavailable,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
