//! Unified error types for Roost

use thiserror::Error;

/// Unified error type for all Roost operations
#[derive(Error, Debug)]
pub enum RoostError {
    // Validation errors (reported back to the sender)
    #[error("{0}")]
    Validation(String),

    // Lookup errors (logged and dropped)
    #[error("Person not found: {0}")]
    PersonNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("Call not found: {0}")]
    CallNotFound(String),

    // Scheduling errors
    #[error("Scheduling impossible: {0}")]
    SchedulingImpossible(String),

    // Collaborator errors
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl RoostError {
    /// True for errors caused by an id that no longer (or never) resolves.
    ///
    /// Webhooks can arrive out of order, so these are treated as no-ops.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::PersonNotFound(_)
                | Self::TaskNotFound(_)
                | Self::AssignmentNotFound(_)
                | Self::CallNotFound(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using RoostError
pub type Result<T> = std::result::Result<T, RoostError>;
