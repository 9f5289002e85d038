//! The consumer loop
//!
//! One task polls, dispatches and commits, one message at a time:
//!
//! 1. decode the envelope (undecodable: commit and drop)
//! 2. look up the topic handler (unrouted: commit and drop)
//! 3. mark the event id in the dedup store (duplicate: commit and drop)
//! 4. await the handler
//! 5. `Ok` commits; `Err` releases the mark, rewinds the partition and backs off
//!
//! A crash between handler completion and commit redelivers the message, and
//! the dedup mark absorbs the second delivery.

use crate::config::ConsumerConfig;
use crate::dedup::DedupStore;
use crate::error::WorkerError;
use crate::event::EventEnvelope;
use crate::metrics::ConsumerMetrics;
use crate::registry::HandlerRegistry;
use crate::source::{InboundMessage, MessageSource};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// What the loop does with a message after the processing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Handler succeeded; commit
    Committed,
    /// Malformed, unrouted or duplicate; commit without side effects
    Drop,
    /// Handler failed; do not commit, redeliver
    Retry,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessOutcome::Committed => "committed",
            ProcessOutcome::Drop => "dropped",
            ProcessOutcome::Retry => "retry",
        }
    }

    pub fn advances_offset(&self) -> bool {
        !matches!(self, ProcessOutcome::Retry)
    }
}

pub struct EventConsumer<S: MessageSource> {
    source: S,
    registry: HandlerRegistry,
    dedup: Arc<dyn DedupStore>,
    config: ConsumerConfig,
    metrics: ConsumerMetrics,
}

impl<S: MessageSource + 'static> EventConsumer<S> {
    pub fn new(
        source: S,
        registry: HandlerRegistry,
        dedup: Arc<dyn DedupStore>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            source,
            registry,
            dedup,
            config,
            metrics: ConsumerMetrics::new("default"),
        }
    }

    pub fn with_metrics(mut self, metrics: ConsumerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Decide the outcome for one message. Never commits; see `settle`.
    pub async fn process_message(&self, message: &InboundMessage) -> ProcessOutcome {
        let envelope = match message.payload.as_deref().map(EventEnvelope::from_slice) {
            Some(Ok(envelope)) => envelope,
            Some(Err(e)) => {
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Dropping malformed event"
                );
                return ProcessOutcome::Drop;
            }
            None => {
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    "Dropping event with empty payload"
                );
                return ProcessOutcome::Drop;
            }
        };

        let Some(handler) = self.registry.dispatch(&message.topic) else {
            warn!(
                topic = %message.topic,
                event_id = %envelope.event_id,
                "No handler registered for topic"
            );
            return ProcessOutcome::Drop;
        };

        if !self
            .dedup
            .mark_if_absent(&envelope.event_id, self.config.dedup_ttl)
            .await
        {
            debug!(
                topic = %message.topic,
                event_id = %envelope.event_id,
                "Duplicate event, skipping"
            );
            return ProcessOutcome::Drop;
        }

        let start = Instant::now();
        let result = handler.handle(&envelope).await;
        self.metrics.handler_duration(&message.topic, start.elapsed());

        match result {
            Ok(()) => {
                debug!(
                    topic = %message.topic,
                    event_id = %envelope.event_id,
                    handler = handler.name(),
                    "Event handled"
                );
                ProcessOutcome::Committed
            }
            Err(e) => {
                error!(
                    topic = %message.topic,
                    event_id = %envelope.event_id,
                    handler = handler.name(),
                    category = e.category().as_str(),
                    error = %e,
                    "Handler failed, event will be redelivered"
                );
                self.metrics.handler_error(&message.topic, e.category().as_str());
                self.dedup.release(&envelope.event_id).await;
                ProcessOutcome::Retry
            }
        }
    }

    /// Apply the outcome: commit, or rewind so the message comes back.
    async fn settle(&self, message: &InboundMessage, outcome: ProcessOutcome) {
        self.metrics.outcome(&message.topic, outcome);

        if outcome.advances_offset() {
            if let Err(e) = self.source.commit(message).await {
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Failed to commit offset"
                );
                self.metrics.commit_failed(&message.topic);
            }
        } else if let Err(e) = self.source.rewind(message).await {
            error!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Failed to rewind partition"
            );
        }
    }

    /// Poll once and settle whatever arrived.
    ///
    /// `Ok(None)` when the poll timed out, `Err` on a transport error.
    pub async fn poll_once(&self) -> Result<Option<ProcessOutcome>, WorkerError> {
        let Some(message) = self.source.poll(self.config.poll_timeout).await? else {
            return Ok(None);
        };

        self.metrics.message_received(&message.topic);
        let outcome = self.process_message(&message).await;
        self.settle(&message, outcome).await;
        Ok(Some(outcome))
    }

    /// Run until `shutdown` turns true. The flag is checked once per
    /// iteration; an in-flight handler always completes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            topics = ?self.registry.topics(),
            poll_timeout_ms = self.config.poll_timeout.as_millis() as u64,
            "Starting event consumer"
        );

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping consumer");
                break;
            }

            let backoff = match self.poll_once().await {
                Ok(Some(ProcessOutcome::Retry)) => true,
                Ok(_) => false,
                Err(e) => {
                    error!(error = %e, "Consumer poll failed");
                    true
                }
            };

            if backoff {
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = tokio::time::sleep(self.config.retry_backoff) => {}
                }
            }
        }

        info!("Event consumer stopped");
    }

    /// Launch the loop on its own task.
    pub fn start(self) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stop_timeout = self.config.stop_timeout;
        let join = tokio::spawn(async move { self.run(shutdown_rx).await });

        ConsumerHandle {
            shutdown: shutdown_tx,
            join,
            stop_timeout,
        }
    }
}

/// Handle to a running consumer task
pub struct ConsumerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    stop_timeout: std::time::Duration,
}

impl ConsumerHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the loop and wait for it, at most the configured stop timeout.
    /// On timeout the task is aborted.
    pub async fn stop(mut self) -> Result<(), WorkerError> {
        let _ = self.shutdown.send(true);

        match tokio::time::timeout(self.stop_timeout, &mut self.join).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WorkerError::Internal(format!("consumer task failed: {}", e))),
            Err(_) => {
                warn!(
                    timeout_secs = self.stop_timeout.as_secs(),
                    "Consumer did not stop in time, aborting"
                );
                self.join.abort();
                Err(WorkerError::Timeout("consumer stop".to_string()))
            }
        }
    }
}
