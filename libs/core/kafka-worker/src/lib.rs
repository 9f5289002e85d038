//! Kafka Worker Framework
//!
//! Consumes events from Kafka topics with manual offset commits and
//! dispatches them to typed handlers.
//!
//! ## Features
//!
//! - **Manual commit**: an offset is committed only after its handler returns `Ok`
//! - **Dedup store**: `SET NX EX` marks absorb redeliveries (fails open)
//! - **Flat routing**: one handler per topic, looked up in a map
//! - **Producer**: idempotent, `acks=all`, keyed by event id
//! - **Rate limiter**: fixed-window Redis counters (fails open)
//!
//! ## Example
//!
//! ```ignore
//! use kafka_worker::{ConsumerConfig, EventConsumer, HandlerRegistry, KafkaSource, RedisDedupStore};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("leave-approved", Arc::new(LeaveApprovedHandler::new(...)))?;
//!
//! let config = ConsumerConfig::default();
//! let source = KafkaSource::new(&kafka, &config, &registry.topics())?;
//! let consumer = EventConsumer::new(source, registry, Arc::new(RedisDedupStore::new(redis)), config);
//!
//! let handle = consumer.start();
//! // ...
//! handle.stop().await?;
//! ```

mod config;
pub mod dedup;
mod error;
mod event;
pub mod metrics;
mod producer;
pub mod rate_limit;
mod registry;
mod source;
mod worker;

pub use config::{consumer_client_config, producer_client_config, ConsumerConfig};
pub use dedup::{DedupStore, InMemoryDedupStore, RedisDedupStore};
pub use error::{ErrorCategory, WorkerError};
pub use event::{EventEnvelope, EventMetadata};
pub use metrics::ConsumerMetrics;
pub use producer::{EventPublisher, KafkaEventProducer, RecordingPublisher};
pub use rate_limit::{
    Clock, InMemoryRateLimiter, ManualClock, RateLimitDecision, RateLimiter, RedisRateLimiter,
    SystemClock,
};
pub use registry::{EventHandler, HandlerRegistry};
pub use source::{InMemorySource, InboundMessage, KafkaSource, MessageSource};
pub use worker::{ConsumerHandle, EventConsumer, ProcessOutcome};
