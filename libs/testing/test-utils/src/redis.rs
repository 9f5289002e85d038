//! Redis test infrastructure
//!
//! Provides a `TestRedis` helper that runs a Redis 8 container for a test.

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::Client;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Test Redis wrapper; the container is stopped and removed on drop.
///
/// Redis 8 is used because the rate limiter relies on `EXPIRE ... NX` (7.0+).
pub struct TestRedis {
    container: ContainerAsync<Redis>,
    client: Client,
    connection: MultiplexedConnection,
    pub connection_string: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let connection_string = format!("redis://127.0.0.1:{}", host_port);

        let client = Client::open(connection_string.clone()).expect("Failed to create Redis client");

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .expect("Failed to connect to Redis");

        tracing::info!(port = host_port, "Test Redis ready (Redis 8-alpine)");

        Self {
            container,
            client,
            connection,
            connection_string,
        }
    }

    /// Raw multiplexed connection for assertions on keys and TTLs
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Auto-reconnecting manager, the handle the dedup store and rate limiter take
    pub async fn connection_manager(&self) -> ConnectionManager {
        ConnectionManager::new(self.client.clone())
            .await
            .expect("Failed to create Redis connection manager")
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Stop the container while keeping handles alive, so callers see a dead backend
    pub async fn stop(&self) {
        self.container
            .stop()
            .await
            .expect("Failed to stop Redis container");
    }
}

impl Drop for TestRedis {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Redis container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::AsyncCommands;

    #[tokio::test]
    async fn test_redis_set_nx_with_expiry() {
        let redis = TestRedis::new().await;
        let mut conn = redis.connection();

        let first: Option<String> = redis::cmd("SET")
            .arg("dedup:key")
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(60)
            .query_async(&mut conn)
            .await
            .unwrap();
        let second: Option<String> = redis::cmd("SET")
            .arg("dedup:key")
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(60)
            .query_async(&mut conn)
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());

        let ttl: i64 = conn.ttl("dedup:key").await.unwrap();
        assert!(ttl > 0 && ttl <= 60);
    }

    #[tokio::test]
    async fn test_connection_manager() {
        let redis = TestRedis::new().await;
        let mut manager = redis.connection_manager().await;

        let count: i64 = manager.incr("counter", 1).await.unwrap();
        assert_eq!(count, 1);
    }
}
