use crate::{env_or_default, env_parse, ConfigError, FromEnv};

/// Kafka broker and consumer-group settings
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub consumer_group_id: String,
    /// Prefix for `client.id`; a random suffix is appended per client
    pub client_id_prefix: String,
    pub auto_offset_reset: String,
    pub max_poll_interval_ms: u32,
    pub session_timeout_ms: u32,
    pub heartbeat_interval_ms: u32,
}

impl KafkaConfig {
    pub fn new(bootstrap_servers: impl Into<String>, consumer_group_id: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            consumer_group_id: consumer_group_id.into(),
            ..Self::default()
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            consumer_group_id: "notification-service-consumer".to_string(),
            client_id_prefix: "notification-service".to_string(),
            auto_offset_reset: "earliest".to_string(),
            max_poll_interval_ms: 300_000,
            session_timeout_ms: 45_000,
            heartbeat_interval_ms: 15_000,
        }
    }
}

impl FromEnv for KafkaConfig {
    /// Reads:
    /// - KAFKA_BOOTSTRAP_SERVERS (default: localhost:9092)
    /// - KAFKA_CONSUMER_GROUP_ID (default: notification-service-consumer)
    /// - KAFKA_CLIENT_ID_PREFIX (default: notification-service)
    /// - KAFKA_AUTO_OFFSET_RESET (default: earliest)
    /// - KAFKA_MAX_POLL_INTERVAL_MS / KAFKA_SESSION_TIMEOUT_MS / KAFKA_HEARTBEAT_INTERVAL_MS
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            bootstrap_servers: env_or_default("KAFKA_BOOTSTRAP_SERVERS", &defaults.bootstrap_servers),
            consumer_group_id: env_or_default("KAFKA_CONSUMER_GROUP_ID", &defaults.consumer_group_id),
            client_id_prefix: env_or_default("KAFKA_CLIENT_ID_PREFIX", &defaults.client_id_prefix),
            auto_offset_reset: env_or_default("KAFKA_AUTO_OFFSET_RESET", &defaults.auto_offset_reset),
            max_poll_interval_ms: env_parse(
                "KAFKA_MAX_POLL_INTERVAL_MS",
                defaults.max_poll_interval_ms,
            )?,
            session_timeout_ms: env_parse("KAFKA_SESSION_TIMEOUT_MS", defaults.session_timeout_ms)?,
            heartbeat_interval_ms: env_parse(
                "KAFKA_HEARTBEAT_INTERVAL_MS",
                defaults.heartbeat_interval_ms,
            )?,
        };

        if config.bootstrap_servers.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "KAFKA_BOOTSTRAP_SERVERS must not be empty".to_string(),
            ));
        }

        Ok(config)
    }
}
