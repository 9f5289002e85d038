//! Recording email provider for tests and local runs

use super::{EmailProvider, SendResult};
use crate::models::Email;
use async_trait::async_trait;
use eyre::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock provider that records sent emails.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another. Failures are scripted: the first `fail_first` calls error, then
/// every call succeeds.
#[derive(Clone)]
pub struct MockEmailProvider {
    name: &'static str,
    sent_emails: Arc<Mutex<Vec<Email>>>,
    calls: Arc<AtomicU32>,
    fail_first: u32,
    healthy: bool,
}

impl MockEmailProvider {
    /// Create a mock provider that always succeeds
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sent_emails: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicU32::new(0)),
            fail_first: 0,
            healthy: true,
        }
    }

    /// Create a mock provider whose first `n` sends fail
    pub fn failing_first(name: &'static str, n: u32) -> Self {
        Self {
            fail_first: n,
            ..Self::new(name)
        }
    }

    /// Create a mock provider that always fails, health check included
    pub fn failing(name: &'static str) -> Self {
        Self {
            fail_first: u32::MAX,
            healthy: false,
            ..Self::new(name)
        }
    }

    /// Number of `send` calls so far, failed ones included
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Get all successfully sent emails
    pub async fn sent_emails(&self) -> Vec<Email> {
        self.sent_emails.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent_emails.lock().await.len()
    }

    /// Check if an email was sent to a specific address
    pub async fn was_sent_to(&self, email: &str) -> bool {
        self.sent_emails.lock().await.iter().any(|e| e.to == email)
    }
}

impl Default for MockEmailProvider {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(eyre::eyre!("{} send failed (call {})", self.name, call + 1));
        }

        self.sent_emails.lock().await.push(email.clone());

        Ok(SendResult {
            message_id: format!("{}-{}", self.name, email.id),
        })
    }

    async fn health_check(&self) -> Result<()> {
        if !self.healthy {
            return Err(eyre::eyre!("{} health check failed", self.name));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_records_sent_email() {
        let provider = MockEmailProvider::new("ses");
        let email = Email::new("test@example.com", "Test Subject").with_text("Test body");

        let result = provider.send(&email).await.unwrap();
        assert_eq!(result.message_id, format!("ses-{}", email.id));

        let sent = provider.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert!(provider.was_sent_to("test@example.com").await);
        assert!(!provider.was_sent_to("other@example.com").await);
    }

    #[tokio::test]
    async fn test_failing_first_then_succeeds() {
        let provider = MockEmailProvider::failing_first("smtp", 2);
        let email = Email::new("test@example.com", "Retry").with_text("Body");

        assert!(provider.send(&email).await.is_err());
        assert!(provider.send(&email).await.is_err());
        assert!(provider.send(&email).await.is_ok());
        assert_eq!(provider.calls(), 3);
        assert_eq!(provider.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let provider = MockEmailProvider::failing("ses");
        let handle = provider.clone();
        let email = Email::new("test@example.com", "Down").with_text("Body");

        let err = provider.send(&email).await.unwrap_err();
        assert!(err.to_string().contains("ses send failed"));
        assert_eq!(handle.calls(), 1);
        assert!(handle.health_check().await.is_err());
    }
}
