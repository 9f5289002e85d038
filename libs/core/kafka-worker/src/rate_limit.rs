//! Fixed-window counters keyed by identifier
//!
//! The window index is `floor(now / window_seconds)`. The first increment in a
//! window sets the key's expiry, so stale windows disappear on their own.
//! Like the dedup store, a failing backend allows the request (fail open).

use crate::metrics;
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

pub const RATE_LIMIT_KEY_PREFIX: &str = "notification:ratelimit:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Count in the current window including this request; 0 when failing open
    pub current_count: u64,
}

impl RateLimitDecision {
    fn from_count(current_count: u64, max_requests: u64) -> Self {
        Self {
            allowed: current_count <= max_requests,
            current_count,
        }
    }

    fn fail_open() -> Self {
        Self {
            allowed: true,
            current_count: 0,
        }
    }
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `identifier` and decide whether it is allowed.
    async fn check(&self, identifier: &str, max_requests: u64, window_seconds: u64)
        -> RateLimitDecision;
}

/// Wall clock in whole seconds
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Settable clock for window-rollover tests
#[derive(Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

fn window_index(now_secs: u64, window_seconds: u64) -> u64 {
    now_secs / window_seconds.max(1)
}

/// `MULTI; INCR key; EXPIRE key window NX; EXEC` in one round trip
///
/// `EXPIRE ... NX` needs Redis 7.0 or newer.
#[derive(Clone)]
pub struct RedisRateLimiter {
    redis: ConnectionManager,
    clock: Arc<dyn Clock>,
    prefix: String,
    op_timeout: Duration,
}

impl RedisRateLimiter {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            clock: Arc::new(SystemClock),
            prefix: RATE_LIMIT_KEY_PREFIX.to_string(),
            op_timeout: crate::dedup::DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn key(&self, identifier: &str, window_seconds: u64) -> String {
        let index = window_index(self.clock.now_secs(), window_seconds);
        format!("{}{}:{}", self.prefix, identifier, index)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> RateLimitDecision {
        let key = self.key(identifier, window_seconds);
        let mut conn = self.redis.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("INCR")
            .arg(&key)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(window_seconds.max(1))
            .arg("NX")
            .ignore();

        match tokio::time::timeout(self.op_timeout, pipe.query_async::<(u64,)>(&mut conn)).await
        {
            Ok(Ok((count,))) => RateLimitDecision::from_count(count, max_requests),
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Rate limit check failed, failing open");
                metrics::fail_open("rate_limit");
                RateLimitDecision::fail_open()
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Rate limit check timed out, failing open"
                );
                metrics::fail_open("rate_limit");
                RateLimitDecision::fail_open()
            }
        }
    }
}

/// Process-local limiter with the same window arithmetic
pub struct InMemoryRateLimiter {
    /// identifier -> (window index, count)
    windows: Mutex<HashMap<String, (u64, u64)>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> RateLimitDecision {
        let index = window_index(self.clock.now_secs(), window_seconds);
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entry = windows.entry(identifier.to_string()).or_insert((index, 0));
        if entry.0 != index {
            *entry = (index, 0);
        }
        entry.1 += 1;

        RateLimitDecision::from_count(entry.1, max_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_index() {
        assert_eq!(window_index(0, 60), 0);
        assert_eq!(window_index(59, 60), 0);
        assert_eq!(window_index(60, 60), 1);
        assert_eq!(window_index(7_200, 3_600), 2);
        assert_eq!(window_index(10, 0), 10);
    }

    #[tokio::test]
    async fn test_fixed_window_allows_up_to_max() {
        let clock = Arc::new(ManualClock::new(1_200));
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());

        let mut allowed = Vec::new();
        for _ in 0..4 {
            allowed.push(limiter.check("x", 3, 60).await.allowed);
        }
        assert_eq!(allowed, vec![true, true, true, false]);

        clock.advance(60);
        let decision = limiter.check("x", 3, 60).await;
        assert!(decision.allowed);
        assert_eq!(decision.current_count, 1);
    }

    #[tokio::test]
    async fn test_identifiers_counted_separately() {
        let limiter = InMemoryRateLimiter::with_clock(Arc::new(ManualClock::new(0)));

        assert_eq!(limiter.check("a@example.com", 1, 3_600).await.current_count, 1);
        assert!(!limiter.check("a@example.com", 1, 3_600).await.allowed);
        assert!(limiter.check("b@example.com", 1, 3_600).await.allowed);
    }
}
