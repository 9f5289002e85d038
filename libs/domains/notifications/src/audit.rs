//! Audit events published after each send

use crate::compose::OutboundEmail;
use crate::topics::{NOTIFICATION_FAILED_EVENT, NOTIFICATION_SENT_EVENT};
use crate::types::NotificationType;
use chrono::{DateTime, Utc};
use kafka_worker::{EventEnvelope, WorkerError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EMAIL_CHANNEL: &str = "email";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSentEvent {
    pub notification_id: String,
    pub notification_type: NotificationType,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
    pub related_event_id: Option<String>,
    pub related_event_type: Option<String>,
}

impl NotificationSentEvent {
    pub fn new(email: &OutboundEmail, trigger: &EventEnvelope) -> Self {
        Self {
            notification_id: Uuid::new_v4().to_string(),
            notification_type: email.notification_type,
            recipient_email: email.recipient_email.clone(),
            recipient_name: email.recipient_name.clone(),
            subject: email.subject.clone(),
            channel: EMAIL_CHANNEL.to_string(),
            sent_at: Utc::now(),
            related_event_id: Some(trigger.event_id.clone()),
            related_event_type: Some(trigger.event_type.clone()),
        }
    }

    /// Wrap in a fresh envelope caused by `trigger`
    pub fn into_envelope(self, trigger: &EventEnvelope) -> Result<EventEnvelope, WorkerError> {
        Ok(EventEnvelope::from_payload(NOTIFICATION_SENT_EVENT, &self)?.caused_by(trigger))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFailedEvent {
    pub notification_id: String,
    pub notification_type: NotificationType,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub channel: String,
    pub failed_at: DateTime<Utc>,
    pub error_message: String,
    pub retry_count: u32,
    pub related_event_id: Option<String>,
    pub related_event_type: Option<String>,
}

impl NotificationFailedEvent {
    pub fn new(
        email: &OutboundEmail,
        trigger: &EventEnvelope,
        error_message: impl Into<String>,
        retry_count: u32,
    ) -> Self {
        Self {
            notification_id: Uuid::new_v4().to_string(),
            notification_type: email.notification_type,
            recipient_email: email.recipient_email.clone(),
            recipient_name: email.recipient_name.clone(),
            subject: email.subject.clone(),
            channel: EMAIL_CHANNEL.to_string(),
            failed_at: Utc::now(),
            error_message: error_message.into(),
            retry_count,
            related_event_id: Some(trigger.event_id.clone()),
            related_event_type: Some(trigger.event_type.clone()),
        }
    }

    pub fn into_envelope(self, trigger: &EventEnvelope) -> Result<EventEnvelope, WorkerError> {
        Ok(EventEnvelope::from_payload(NOTIFICATION_FAILED_EVENT, &self)?.caused_by(trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use email::NotificationContext;
    use serde_json::json;

    fn outbound() -> OutboundEmail {
        OutboundEmail {
            recipient_email: "jane@example.com".to_string(),
            recipient_name: "Jane Doe".to_string(),
            subject: "Leave Request Approved".to_string(),
            notification_type: NotificationType::LeaveApproved,
            context: NotificationContext::new("Jane Doe", "Leave Request Approved", "Enjoy")
                .into(),
        }
    }

    #[test]
    fn test_sent_envelope_links_trigger() {
        let trigger = EventEnvelope::new("leave.approved", json!({})).with_event_id("abc");
        let envelope = NotificationSentEvent::new(&outbound(), &trigger)
            .into_envelope(&trigger)
            .unwrap();

        assert_eq!(envelope.event_type, "notification.sent");
        assert_ne!(envelope.event_id, "abc");
        assert_eq!(envelope.metadata.causation_id.as_deref(), Some("abc"));
        assert_eq!(envelope.metadata.correlation_id, trigger.metadata.correlation_id);
        assert_eq!(envelope.data["related_event_id"], "abc");
        assert_eq!(envelope.data["related_event_type"], "leave.approved");
        assert_eq!(envelope.data["notification_type"], "leave_approved");
        assert_eq!(envelope.data["channel"], "email");
    }

    #[test]
    fn test_failed_envelope_carries_error() {
        let trigger = EventEnvelope::new("leave.approved", json!({})).with_event_id("abc");
        let envelope = NotificationFailedEvent::new(&outbound(), &trigger, "all providers down", 3)
            .into_envelope(&trigger)
            .unwrap();

        let event: NotificationFailedEvent = envelope.parse_data().unwrap();
        assert_eq!(envelope.event_type, "notification.failed");
        assert_eq!(event.error_message, "all providers down");
        assert_eq!(event.retry_count, 3);
        assert_eq!(event.recipient_email, "jane@example.com");
    }
}
