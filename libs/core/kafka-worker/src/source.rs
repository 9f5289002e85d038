//! Message sources the consumer loop polls
//!
//! `KafkaSource` is the production source. `InMemorySource` has the same
//! commit/rewind contract and backs the tests of every crate above this one.

use crate::config::{consumer_client_config, ConsumerConfig};
use crate::error::WorkerError;
use async_trait::async_trait;
use core_config::KafkaConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// A message detached from the client that fetched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait up to `timeout` for the next message; `Ok(None)` when nothing arrived.
    async fn poll(&self, timeout: Duration) -> Result<Option<InboundMessage>, WorkerError>;

    /// Commit the position after `message` for its partition.
    async fn commit(&self, message: &InboundMessage) -> Result<(), WorkerError>;

    /// Move the partition back so `message` is delivered again.
    async fn rewind(&self, message: &InboundMessage) -> Result<(), WorkerError>;
}

/// Kafka consumer-group member with auto-commit disabled
pub struct KafkaSource {
    consumer: StreamConsumer,
    seek_timeout: Duration,
}

impl KafkaSource {
    /// Create the consumer and subscribe to `topics`
    pub fn new(
        kafka: &KafkaConfig,
        config: &ConsumerConfig,
        topics: &[&str],
    ) -> Result<Self, WorkerError> {
        if topics.is_empty() {
            return Err(WorkerError::Config("no topics to subscribe to".to_string()));
        }

        let consumer: StreamConsumer = consumer_client_config(kafka).create()?;
        consumer.subscribe(topics)?;

        info!(
            brokers = %kafka.bootstrap_servers,
            group = %kafka.consumer_group_id,
            topics = topics.len(),
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            seek_timeout: config.seek_timeout,
        })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn poll(&self, timeout: Duration) -> Result<Option<InboundMessage>, WorkerError> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Err(KafkaError::PartitionEOF(partition))) => {
                debug!(partition, "Reached end of partition");
                Ok(None)
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(msg)) => Ok(Some(InboundMessage {
                topic: msg.topic().to_string(),
                partition: msg.partition(),
                offset: msg.offset(),
                key: msg.key().map(<[u8]>::to_vec),
                payload: msg.payload().map(<[u8]>::to_vec),
            })),
        }
    }

    async fn commit(&self, message: &InboundMessage) -> Result<(), WorkerError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        self.consumer.commit(&tpl, CommitMode::Sync)?;
        Ok(())
    }

    async fn rewind(&self, message: &InboundMessage) -> Result<(), WorkerError> {
        self.consumer.seek(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset),
            self.seek_timeout,
        )?;
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryState {
    queue: VecDeque<InboundMessage>,
    committed: Vec<InboundMessage>,
    rewinds: usize,
    next_offset: i64,
}

/// Single-partition in-memory source
///
/// Clones share state, so a test can keep a handle after moving the source
/// into a consumer.
#[derive(Clone, Default)]
pub struct InMemorySource {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to `topic`; returns its offset
    pub fn push(&self, topic: &str, payload: impl Into<Vec<u8>>) -> i64 {
        let mut state = self.lock();
        let offset = state.next_offset;
        state.next_offset += 1;
        state.queue.push_back(InboundMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            key: None,
            payload: Some(payload.into()),
        });
        offset
    }

    /// Offsets committed so far, in commit order
    pub fn committed_offsets(&self) -> Vec<i64> {
        self.lock().committed.iter().map(|m| m.offset).collect()
    }

    pub fn rewinds(&self) -> usize {
        self.lock().rewinds
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn poll(&self, timeout: Duration) -> Result<Option<InboundMessage>, WorkerError> {
        let next = self.lock().queue.pop_front();
        if next.is_none() {
            tokio::time::sleep(timeout).await;
        }
        Ok(next)
    }

    async fn commit(&self, message: &InboundMessage) -> Result<(), WorkerError> {
        self.lock().committed.push(message.clone());
        Ok(())
    }

    async fn rewind(&self, message: &InboundMessage) -> Result<(), WorkerError> {
        let mut state = self.lock();
        state.rewinds += 1;
        state.queue.push_front(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_in_memory_source_round() {
        let source = InMemorySource::new();
        assert_eq!(source.push("leave-approved", "a"), 0);
        assert_eq!(source.push("leave-approved", "b"), 1);

        let first = source.poll(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(first.offset, 0);
        source.rewind(&first).await.unwrap();

        let again = source.poll(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(again, first);
        source.commit(&again).await.unwrap();

        assert_eq!(source.committed_offsets(), vec![0]);
        assert_eq!(source.rewinds(), 1);
        assert_eq!(source.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_poll_waits_for_timeout() {
        let source = InMemorySource::new();
        let start = tokio::time::Instant::now();

        assert!(source.poll(Duration::from_secs(1)).await.unwrap().is_none());
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
