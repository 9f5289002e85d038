//! Worker error types and error categorization
//!
//! - **Transient**: the operation may succeed if the message is redelivered
//! - **Permanent**: redelivery will fail the same way

use thiserror::Error;

/// Category of error, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transient,
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }
}

/// Errors raised by the consumer, producer and handlers
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Broker or client error from librdkafka
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Envelope or payload (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Handler failed to process an event
    #[error("Handler error: {message}")]
    Handler {
        message: String,
        category: ErrorCategory,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal error (task join failures and the like)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Create a transient handler error
    pub fn transient(message: impl Into<String>) -> Self {
        WorkerError::Handler {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent handler error
    pub fn permanent(message: impl Into<String>) -> Self {
        WorkerError::Handler {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkerError::Kafka(_) => ErrorCategory::Transient,
            WorkerError::Serialization(_) => ErrorCategory::Permanent,
            WorkerError::Handler { category, .. } => *category,
            WorkerError::Config(_) => ErrorCategory::Permanent,
            WorkerError::Timeout(_) => ErrorCategory::Transient,
            WorkerError::Internal(_) => ErrorCategory::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Serialization(err.to_string())
    }
}
