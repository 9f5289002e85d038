//! Shared test utilities for the notification workspace
//!
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: deterministic event ids, recipients and key prefixes
//!
//! # Redis Testing
//!
//! Add `features = ["redis"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::TestRedis;
//!
//! #[tokio::test]
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let manager = redis.connection_manager().await;
//!     let store = RedisDedupStore::new(manager);
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Builder for test data with deterministic values
///
/// Two builders created from the same test name produce the same ids, so a
/// failing test can be replayed. Different test names never share Redis keys.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (seed is the hash of the name)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_leave_approved");
    /// assert_eq!(builder.event_id(1), builder.event_id(1));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic event id (UUID formatted) for the `n`-th event of a test
    pub fn event_id(&self, n: u64) -> String {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&n.to_le_bytes());
        Uuid::from_bytes(bytes).to_string()
    }

    /// Recipient address unique to this test
    pub fn email(&self, local: &str) -> String {
        format!("{}.{}@test.example.com", local, self.seed)
    }

    /// Redis key prefix unique to this test, e.g. `test:1234:dedup:`
    pub fn key_prefix(&self, kind: &str) -> String {
        format!("test:{}:{}:", self.seed, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.event_id(1), builder2.event_id(1));
        assert_eq!(builder1.email("jane"), builder2.email("jane"));
        assert_ne!(builder1.event_id(1), builder1.event_id(2));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.event_id(1), builder2.event_id(1));
        assert_ne!(builder1.key_prefix("dedup"), builder2.key_prefix("dedup"));
    }

    #[test]
    fn test_event_id_is_uuid() {
        let builder = TestDataBuilder::from_test_name("uuid");
        assert!(Uuid::parse_str(&builder.event_id(7)).is_ok());
    }
}
