//! Idempotency marks keyed by event id
//!
//! Store failures never block processing: an unreachable or slow Redis makes
//! `mark_if_absent` answer `true` (fail open) after logging a warning.

use crate::metrics;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

pub const DEDUP_KEY_PREFIX: &str = "notification:dedup:";
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Atomically mark `id` as seen for `ttl`.
    ///
    /// `true` on first sighting (proceed), `false` if already marked (skip).
    async fn mark_if_absent(&self, id: &str, ttl: Duration) -> bool;

    /// Remove the mark so the next delivery is processed again.
    async fn release(&self, id: &str);
}

/// `SET key 1 NX EX ttl` over a shared connection manager
#[derive(Clone)]
pub struct RedisDedupStore {
    redis: ConnectionManager,
    prefix: String,
    op_timeout: Duration,
}

impl RedisDedupStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            prefix: DEDUP_KEY_PREFIX.to_string(),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn mark_if_absent(&self, id: &str, ttl: Duration) -> bool {
        let key = self.key(id);
        let mut conn = self.redis.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1));

        match tokio::time::timeout(self.op_timeout, cmd.query_async::<Option<String>>(&mut conn))
            .await
        {
            Ok(Ok(reply)) => reply.is_some(),
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Dedup check failed, failing open");
                metrics::fail_open("dedup");
                true
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Dedup check timed out, failing open"
                );
                metrics::fail_open("dedup");
                true
            }
        }
    }

    async fn release(&self, id: &str) {
        let key = self.key(id);
        let mut conn = self.redis.clone();
        let mut cmd = redis::cmd("DEL");
        cmd.arg(&key);

        match tokio::time::timeout(self.op_timeout, cmd.query_async::<i64>(&mut conn)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "Failed to release dedup mark"),
            Err(_) => warn!(key = %key, "Releasing dedup mark timed out"),
        }
    }
}

/// Process-local store with the same contract, for tests and local runs.
///
/// Expiry follows `tokio::time`, so paused-clock tests can step over a TTL.
/// Expired marks are dropped whenever a new mark is written.
#[derive(Default)]
pub struct InMemoryDedupStore {
    marks: Mutex<HashMap<String, Instant>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        let now = Instant::now();
        self.lock().get(id).is_some_and(|expires| *expires > now)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.marks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn mark_if_absent(&self, id: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut marks = self.lock();
        match marks.get(id) {
            Some(expires) if *expires > now => false,
            _ => {
                marks.retain(|_, expires| *expires > now);
                marks.insert(id.to_string(), now + ttl);
                true
            }
        }
    }

    async fn release(&self, id: &str) {
        self.lock().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_mark_if_absent_until_expiry() {
        let store = InMemoryDedupStore::new();
        let ttl = Duration::from_secs(86_400);

        assert!(store.mark_if_absent("evt-1", ttl).await);
        assert!(!store.mark_if_absent("evt-1", ttl).await);
        assert!(store.mark_if_absent("evt-2", ttl).await);

        tokio::time::advance(ttl + Duration::from_secs(1)).await;

        assert!(!store.contains("evt-1"));
        assert!(store.mark_if_absent("evt-1", ttl).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_marks_are_dropped_on_write() {
        let store = InMemoryDedupStore::new();
        let ttl = Duration::from_secs(60);

        for i in 0..10 {
            assert!(store.mark_if_absent(&format!("old-{i}"), ttl).await);
        }
        assert_eq!(store.lock().len(), 10);

        tokio::time::advance(ttl + Duration::from_secs(1)).await;
        assert!(store.mark_if_absent("fresh", ttl).await);

        let marks = store.lock();
        assert_eq!(marks.len(), 1);
        assert!(marks.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_release_allows_reprocessing() {
        let store = InMemoryDedupStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.mark_if_absent("evt-3", ttl).await);
        store.release("evt-3").await;
        assert!(store.mark_if_absent("evt-3", ttl).await);

        // releasing an unknown id is a no-op
        store.release("never-seen").await;
    }
}
