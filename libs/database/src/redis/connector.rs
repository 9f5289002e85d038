use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use super::RedisConfig;
use crate::common::{DatabaseError, DatabaseResult, RetryConfig, retry_with_backoff};

/// Open a `ConnectionManager` and verify it with `PING`
///
/// The manager reconnects on its own after the initial connection.
pub async fn connect(url: &str) -> DatabaseResult<ConnectionManager> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    Ok(manager)
}

pub async fn connect_from_config(config: &RedisConfig) -> DatabaseResult<ConnectionManager> {
    let manager = connect(&config.build_url()).await?;
    info!(endpoint = %config.redacted_url(), "Connected to Redis");
    Ok(manager)
}

/// Connect with exponential backoff, for startup against a Redis that may
/// not be reachable yet
pub async fn connect_from_config_with_retry(
    config: &RedisConfig,
    retry_config: Option<RetryConfig>,
) -> DatabaseResult<ConnectionManager> {
    retry_with_backoff(|| connect_from_config(config), retry_config.unwrap_or_default())
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(format!("{}: {}", config.redacted_url(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use test_utils::TestRedis;

    #[tokio::test]
    async fn test_connect_from_config() {
        let redis = TestRedis::new().await;
        let config = RedisConfig::new(redis.connection_string());

        let mut manager = connect_from_config(&config).await.unwrap();
        let pong: String = redis::cmd("PING").query_async(&mut manager).await.unwrap();
        assert_eq!(pong, "PONG");
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let config = RedisConfig::new("redis://127.0.0.1:1");
        let retry = RetryConfig::new()
            .with_max_retries(1)
            .with_initial_delay(Duration::from_millis(10));

        let err = connect_from_config_with_retry(&config, Some(retry))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ConnectionFailed(_)));
    }
}
