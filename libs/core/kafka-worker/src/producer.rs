//! Event producer for audit and status events
//!
//! Publishing never raises: failures are logged and reported as `false` so
//! callers on the notification path can ignore them.

use crate::config::producer_client_config;
use crate::error::WorkerError;
use crate::event::EventEnvelope;
use crate::metrics;
use async_trait::async_trait;
use core_config::KafkaConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue `envelope`; the broker acknowledgement is logged when it arrives.
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> bool;

    /// Publish and wait for the broker acknowledgement, at most `timeout`.
    async fn publish_sync(&self, topic: &str, envelope: &EventEnvelope, timeout: Duration)
        -> bool;

    /// Wait for queued messages to be delivered.
    async fn flush(&self, timeout: Duration) -> Result<(), WorkerError>;
}

/// Kafka producer keyed by event id, with envelope headers
#[derive(Clone)]
pub struct KafkaEventProducer {
    producer: FutureProducer,
}

impl KafkaEventProducer {
    pub fn new(kafka: &KafkaConfig) -> Result<Self, WorkerError> {
        let producer: FutureProducer = producer_client_config(kafka).create()?;

        info!(
            brokers = %kafka.bootstrap_servers,
            "Kafka producer created with idempotence and acks=all"
        );

        Ok(Self { producer })
    }

    fn headers(envelope: &EventEnvelope) -> OwnedHeaders {
        OwnedHeaders::new()
            .insert(Header {
                key: "event_type",
                value: Some(envelope.event_type.as_bytes()),
            })
            .insert(Header {
                key: "event_id",
                value: Some(envelope.event_id.as_bytes()),
            })
            .insert(Header {
                key: "source_service",
                value: Some(envelope.metadata.source_service.as_bytes()),
            })
            .insert(Header {
                key: "correlation_id",
                value: Some(envelope.metadata.correlation_id.as_bytes()),
            })
    }

    fn encode(topic: &str, envelope: &EventEnvelope) -> Option<Vec<u8>> {
        match envelope.to_vec() {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(topic = %topic, event_id = %envelope.event_id, error = %e, "Failed to encode event");
                None
            }
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventProducer {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> bool {
        let Some(payload) = Self::encode(topic, envelope) else {
            return false;
        };

        let record = FutureRecord::to(topic)
            .key(&envelope.event_id)
            .payload(&payload)
            .headers(Self::headers(envelope));

        match self.producer.send_result(record) {
            Ok(delivery) => {
                let topic_name = topic.to_string();
                let event_id = envelope.event_id.clone();
                tokio::spawn(async move {
                    match delivery.await {
                        Ok(Ok(_)) => {
                            debug!(topic = %topic_name, event_id = %event_id, "Event delivered");
                            metrics::publish_result(&topic_name, true);
                        }
                        Ok(Err((e, _))) => {
                            error!(topic = %topic_name, event_id = %event_id, error = %e, "Event delivery failed");
                            metrics::publish_result(&topic_name, false);
                        }
                        Err(_) => {
                            warn!(topic = %topic_name, event_id = %event_id, "Delivery confirmation dropped");
                        }
                    }
                });

                info!(topic = %topic, event_id = %envelope.event_id, "Event queued");
                true
            }
            Err((e, _)) => {
                error!(topic = %topic, event_id = %envelope.event_id, error = %e, "Failed to queue event");
                metrics::publish_result(topic, false);
                false
            }
        }
    }

    async fn publish_sync(
        &self,
        topic: &str,
        envelope: &EventEnvelope,
        timeout: Duration,
    ) -> bool {
        let Some(payload) = Self::encode(topic, envelope) else {
            return false;
        };

        let record = FutureRecord::to(topic)
            .key(&envelope.event_id)
            .payload(&payload)
            .headers(Self::headers(envelope));

        let delivered = match tokio::time::timeout(
            timeout,
            self.producer.send(record, Timeout::After(timeout)),
        )
        .await
        {
            Ok(Ok(_)) => {
                debug!(topic = %topic, event_id = %envelope.event_id, "Event acknowledged");
                true
            }
            Ok(Err((e, _))) => {
                error!(topic = %topic, event_id = %envelope.event_id, error = %e, "Event delivery failed");
                false
            }
            Err(_) => {
                warn!(
                    topic = %topic,
                    event_id = %envelope.event_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Event acknowledgement timed out"
                );
                false
            }
        };

        metrics::publish_result(topic, delivered);
        delivered
    }

    async fn flush(&self, timeout: Duration) -> Result<(), WorkerError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| WorkerError::Internal(format!("flush task failed: {}", e)))??;
        Ok(())
    }
}

/// Publisher that records envelopes in memory
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, EventEnvelope)>>,
    failing: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish reports failure (nothing is recorded)
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn published(&self) -> Vec<(String, EventEnvelope)> {
        self.lock().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<EventEnvelope> {
        self.lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, envelope)| envelope.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, EventEnvelope)>> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, topic: &str, envelope: &EventEnvelope) -> bool {
        if self.failing {
            return false;
        }
        self.lock().push((topic.to_string(), envelope.clone()));
        true
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> bool {
        self.record(topic, envelope)
    }

    async fn publish_sync(&self, topic: &str, envelope: &EventEnvelope, _timeout: Duration) -> bool {
        self.record(topic, envelope)
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), WorkerError> {
        Ok(())
    }
}
