//! Kafka handlers for the HR topics

use crate::dispatch::NotificationDispatcher;
use crate::topics::{EventKind, TOPIC_ROUTES};
use async_trait::async_trait;
use kafka_worker::{EventEnvelope, EventHandler, HandlerRegistry, WorkerError};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes the events of one [`EventKind`] to the shared dispatcher
pub struct EmailEventHandler {
    kind: EventKind,
    dispatcher: Arc<NotificationDispatcher>,
}

impl EmailEventHandler {
    pub fn new(kind: EventKind, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { kind, dispatcher }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

#[async_trait]
impl EventHandler for EmailEventHandler {
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), WorkerError> {
        self.dispatcher.dispatch(self.kind, envelope).await
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// One handler per kind, registered under every topic of [`TOPIC_ROUTES`]
pub fn build_registry(dispatcher: Arc<NotificationDispatcher>) -> Result<HandlerRegistry, WorkerError> {
    let mut handlers: HashMap<EventKind, Arc<dyn EventHandler>> = HashMap::new();
    let mut registry = HandlerRegistry::new();

    for (topic, kind) in TOPIC_ROUTES {
        let handler = handlers
            .entry(*kind)
            .or_insert_with(|| Arc::new(EmailEventHandler::new(*kind, dispatcher.clone())))
            .clone();
        registry.register(*topic, handler)?;
    }

    Ok(registry)
}
