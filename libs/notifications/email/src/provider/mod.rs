//! Email provider implementations

pub mod mock;
pub mod ses;
pub mod smtp;

pub use mock::MockEmailProvider;
pub use ses::{SesConfig, SesProvider};
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::models::Email;
use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Result of sending an email
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Provider-specific message ID
    pub message_id: String,
}

/// The two delivery backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Ses,
    Smtp,
}

/// Trait for email providers
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email
    async fn send(&self, email: &Email) -> Result<SendResult>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<()>;

    /// Get provider name
    fn name(&self) -> &'static str;
}
