//! Event envelope shared by every topic
//!
//! Inbound messages missing `version`, `timestamp` or `metadata` take the
//! defaults below; `event_id` and `event_type` are required.

use crate::error::WorkerError;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SOURCE_SERVICE: &str = "notification-service";
pub const ENVELOPE_VERSION: &str = "1.0";

fn default_source_service() -> String {
    DEFAULT_SOURCE_SERVICE.to_string()
}

fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

fn default_version() -> String {
    ENVELOPE_VERSION.to_string()
}

/// Tracing metadata; informational only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default = "default_source_service")]
    pub source_service: String,
    #[serde(default = "new_uuid")]
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            source_service: default_source_service(),
            correlation_id: new_uuid(),
            causation_id: None,
            actor_user_id: None,
            actor_role: None,
            trace_id: None,
        }
    }
}

/// Envelope wrapping every event on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique id, also the dedup key
    pub event_id: String,
    /// Dotted event type, e.g. `leave.approved`
    pub event_type: String,
    #[serde(default = "now_iso8601")]
    pub timestamp: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// A fresh envelope with a new event id and default metadata
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_id: new_uuid(),
            event_type: event_type.into(),
            timestamp: now_iso8601(),
            version: default_version(),
            data,
            metadata: EventMetadata::default(),
        }
    }

    /// Build an envelope from a serializable payload
    pub fn from_payload<T: Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, WorkerError> {
        Ok(Self::new(event_type, serde_json::to_value(payload)?))
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Mark this envelope as caused by `parent`: the causation id is the
    /// parent's event id and the correlation id is carried over.
    pub fn caused_by(mut self, parent: &EventEnvelope) -> Self {
        self.metadata.causation_id = Some(parent.event_id.clone());
        self.metadata.correlation_id = parent.metadata.correlation_id.clone();
        self
    }

    /// Deserialize `data` into the payload type for this event
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, WorkerError> {
        Ok(T::deserialize(&self.data)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, WorkerError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, WorkerError> {
        Ok(serde_json::to_vec(self)?)
    }
}
