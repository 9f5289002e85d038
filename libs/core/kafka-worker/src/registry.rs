//! Topic to handler registry
//!
//! The registry is filled before the consumer starts and then moved into it,
//! so it never changes while messages flow. Dispatch is a single map lookup.

use crate::error::WorkerError;
use crate::event::EventEnvelope;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Handler for the events of one or more topics.
///
/// # Example
///
/// ```rust,ignore
/// use kafka_worker::{EventEnvelope, EventHandler, WorkerError};
///
/// struct LeaveApprovedHandler { /* ... */ }
///
/// #[async_trait]
/// impl EventHandler for LeaveApprovedHandler {
///     async fn handle(&self, envelope: &EventEnvelope) -> Result<(), WorkerError> {
///         let leave: LeaveApproved = envelope.parse_data()?;
///         self.notify(&leave).await
///     }
///
///     fn name(&self) -> &'static str {
///         "leave_approved"
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one event.
    ///
    /// `Ok(())` lets the consumer commit the offset. Any `Err` leaves the
    /// offset uncommitted and the message is redelivered.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), WorkerError>;

    /// Handler name for logs and metrics
    fn name(&self) -> &'static str;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. A topic takes at most one handler.
    pub fn register(
        &mut self,
        topic: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), WorkerError> {
        let topic = topic.into();
        if let Some(existing) = self.handlers.get(&topic) {
            return Err(WorkerError::Config(format!(
                "topic '{}' already routed to handler '{}'",
                topic,
                existing.name()
            )));
        }

        info!(topic = %topic, handler = handler.name(), "Registered handler");
        self.handlers.insert(topic, handler);
        Ok(())
    }

    pub fn dispatch(&self, topic: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(topic)
    }

    /// Subscribed topic set, sorted
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
