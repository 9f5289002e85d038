//! Error types for the email library.

use core_config::ConfigError;
use thiserror::Error;

/// Result type for email operations.
pub type EmailResult<T> = Result<T, EmailError>;

#[derive(Debug, Error)]
pub enum EmailError {
    /// Provider could not be built or reached
    #[error("Provider error: {0}")]
    Provider(String),

    /// Template registration or rendering failed
    #[error("Template error: {0}")]
    Template(String),

    /// A template context failed validation
    #[error("Invalid template context: {0}")]
    InvalidContext(#[from] validator::ValidationErrors),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<handlebars::RenderError> for EmailError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for EmailError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<eyre::Report> for EmailError {
    fn from(err: eyre::Report) -> Self {
        Self::Provider(format!("{:#}", err))
    }
}
