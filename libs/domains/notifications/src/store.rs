//! Notification record persistence
//!
//! Records move `pending -> sent`, or `pending -> retrying -> {retrying | sent | failed}`.
//! `sent` and `failed` are final.

use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use email::EmailStatus;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a `pending` record and return its id
    async fn create_pending(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> NotificationResult<Uuid>;

    async fn update_status(
        &self,
        id: Uuid,
        status: EmailStatus,
        error: Option<String>,
        retry_count: u32,
    ) -> NotificationResult<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Process-local store, used when no database is configured
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: Mutex<HashMap<Uuid, NotificationRecord>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<NotificationRecord> {
        self.lock().get(&id).cloned()
    }

    /// All records, oldest first
    pub fn records(&self) -> Vec<NotificationRecord> {
        let mut records: Vec<NotificationRecord> = self.lock().values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn count_with_status(&self, status: EmailStatus) -> usize {
        self.lock().values().filter(|r| r.status == status).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, NotificationRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create_pending(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> NotificationResult<Uuid> {
        let now = Utc::now();
        let record = NotificationRecord {
            id: Uuid::now_v7(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            status: EmailStatus::Pending,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.lock().insert(id, record);
        Ok(id)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: EmailStatus,
        error: Option<String>,
        retry_count: u32,
    ) -> NotificationResult<()> {
        let mut records = self.lock();
        let record = records
            .get_mut(&id)
            .ok_or(NotificationError::RecordNotFound(id))?;

        if record.status.is_terminal() || status == EmailStatus::Pending {
            return Err(NotificationError::InvalidTransition {
                id,
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        record.error = error;
        record.retry_count = retry_count;
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_to_sent() {
        let store = InMemoryNotificationStore::new();
        let id = store
            .create_pending("jane@example.com", "Leave Approved", "<p>ok</p>")
            .await
            .unwrap();
        assert_eq!(store.get(id).unwrap().status, EmailStatus::Pending);

        store
            .update_status(id, EmailStatus::Sent, None, 0)
            .await
            .unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.status, EmailStatus::Sent);
        assert!(record.updated_at >= record.created_at);
    }

    #[tokio::test]
    async fn test_retrying_then_failed() {
        let store = InMemoryNotificationStore::new();
        let id = store.create_pending("a@example.com", "s", "b").await.unwrap();

        store
            .update_status(id, EmailStatus::Retrying, Some("smtp down".into()), 1)
            .await
            .unwrap();
        store
            .update_status(id, EmailStatus::Retrying, Some("smtp down".into()), 2)
            .await
            .unwrap();
        store
            .update_status(id, EmailStatus::Failed, Some("smtp down".into()), 3)
            .await
            .unwrap();

        let record = store.get(id).unwrap();
        assert_eq!(record.retry_count, 3);
        assert_eq!(record.error.as_deref(), Some("smtp down"));
        assert_eq!(store.count_with_status(EmailStatus::Failed), 1);
    }

    #[tokio::test]
    async fn test_terminal_records_do_not_move() {
        let store = InMemoryNotificationStore::new();
        let id = store.create_pending("a@example.com", "s", "b").await.unwrap();
        store.update_status(id, EmailStatus::Sent, None, 0).await.unwrap();

        let err = store
            .update_status(id, EmailStatus::Retrying, None, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotificationError::InvalidTransition {
                from: EmailStatus::Sent,
                to: EmailStatus::Retrying,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let store = InMemoryNotificationStore::new();
        let err = store
            .update_status(Uuid::new_v4(), EmailStatus::Sent, None, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::RecordNotFound(_)));
    }
}
