//! Consumer loop settings and librdkafka client configuration

use core_config::KafkaConfig;
use rdkafka::ClientConfig;
use std::time::Duration;
use uuid::Uuid;

/// Settings for the consumer loop
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// How long a single poll waits for a message
    pub poll_timeout: Duration,

    /// How long `ConsumerHandle::stop` waits for the loop to exit
    pub stop_timeout: Duration,

    /// Pause before polling again after a handler failure
    pub retry_backoff: Duration,

    /// How long a processed event id stays marked in the dedup store
    pub dedup_ttl: Duration,

    /// Timeout for seeking a partition back to a failed offset
    pub seek_timeout: Duration,
}

impl ConsumerConfig {
    pub fn new() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(1),
            dedup_ttl: Duration::from_secs(86_400),
            seek_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `{prefix}-{role}-{8 hex chars}`, unique per client instance
fn client_id(prefix: &str, role: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, role, &suffix[..8])
}

/// librdkafka settings for a manually committing consumer
pub fn consumer_client_config(kafka: &KafkaConfig) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", &kafka.bootstrap_servers)
        .set("group.id", &kafka.consumer_group_id)
        .set("client.id", client_id(&kafka.client_id_prefix, "consumer"))
        .set("auto.offset.reset", &kafka.auto_offset_reset)
        .set("enable.auto.commit", "false")
        .set("enable.partition.eof", "false")
        .set("max.poll.interval.ms", kafka.max_poll_interval_ms.to_string())
        .set("session.timeout.ms", kafka.session_timeout_ms.to_string())
        .set("heartbeat.interval.ms", kafka.heartbeat_interval_ms.to_string());
    config
}

/// librdkafka settings for the idempotent, all-replica-acknowledged producer
pub fn producer_client_config(kafka: &KafkaConfig) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", &kafka.bootstrap_servers)
        .set("client.id", client_id(&kafka.client_id_prefix, "producer"))
        .set("acks", "all")
        .set("enable.idempotence", "true")
        .set("retries", "5")
        .set("retry.backoff.ms", "100")
        .set("max.in.flight.requests.per.connection", "5")
        .set("compression.type", "snappy")
        .set("linger.ms", "5")
        .set("batch.size", "16384");
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_config_defaults() {
        let config = ConsumerConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_secs(1));
        assert_eq!(config.stop_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_backoff, Duration::from_secs(1));
        assert_eq!(config.dedup_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_builder_pattern() {
        let config = ConsumerConfig::new()
            .with_poll_timeout(Duration::from_millis(200))
            .with_dedup_ttl(Duration::from_secs(60));

        assert_eq!(config.poll_timeout, Duration::from_millis(200));
        assert_eq!(config.dedup_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_consumer_client_config_disables_auto_commit() {
        let kafka = KafkaConfig::new("broker:9092", "hr-notifications");
        let config = consumer_client_config(&kafka);

        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("group.id"), Some("hr-notifications"));
        assert_eq!(config.get("auto.offset.reset"), Some("earliest"));
        assert_eq!(config.get("session.timeout.ms"), Some("45000"));

        let client_id = config.get("client.id").unwrap();
        assert!(client_id.starts_with("notification-service-consumer-"));
        assert_eq!(client_id.len(), "notification-service-consumer-".len() + 8);
    }

    #[test]
    fn test_producer_client_config_is_idempotent() {
        let config = producer_client_config(&KafkaConfig::default());

        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("enable.idempotence"), Some("true"));
        assert_eq!(config.get("compression.type"), Some("snappy"));
        assert_eq!(config.get("max.in.flight.requests.per.connection"), Some("5"));
    }
}
