//! Error types for the notifications domain.

use email::{EmailError, EmailStatus};
use kafka_worker::WorkerError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Notification record not found.
    #[error("Notification record not found: {0}")]
    RecordNotFound(Uuid),

    /// A record in a terminal state cannot move again.
    #[error("Notification {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: EmailStatus,
        to: EmailStatus,
    },

    /// Persistence collaborator error.
    #[error("Store error: {0}")]
    Store(String),

    /// Rendering or delivery error from the email library.
    #[error(transparent)]
    Email(#[from] EmailError),

    /// Consumer, producer or payload error.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] core_config::ConfigError),
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Worker(WorkerError::from(err))
    }
}
