//! Per-email dispatch for one consumed event
//!
//! Each composed email goes through: sub-step dedup, rate limit, render,
//! record, deliver, audit. A delivery failure below `max_retries` releases the
//! sub-step key and fails the event so the consumer redelivers it; emails that
//! already went out stay marked and are skipped on the next pass.

use crate::audit::{NotificationFailedEvent, NotificationSentEvent};
use crate::compose::{Composer, OutboundEmail, salary_increment_due_summary};
use crate::events::HrEvent;
use crate::settings::DispatchSettings;
use crate::store::NotificationStore;
use crate::topics::{EventKind, NOTIFICATION_FAILED, NOTIFICATION_SENT};
use email::{Email, EmailStatus, HybridDeliveryEngine, TemplateRenderer};
use kafka_worker::{DedupStore, EventEnvelope, EventPublisher, RateLimiter, WorkerError};
use metrics::counter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Attempt bookkeeping for an email whose delivery is being retried
#[derive(Debug, Default, Clone, Copy)]
struct Attempts {
    record_id: Option<Uuid>,
    failed: u32,
}

/// Entries live as long as the sub-step dedup mark would
type InFlight = HashMap<String, (Attempts, Instant)>;

pub struct NotificationDispatcher {
    composer: Composer,
    settings: DispatchSettings,
    engine: Arc<HybridDeliveryEngine>,
    renderer: Arc<dyn TemplateRenderer>,
    store: Arc<dyn NotificationStore>,
    publisher: Arc<dyn EventPublisher>,
    dedup: Arc<dyn DedupStore>,
    limiter: Arc<dyn RateLimiter>,
    in_flight: Mutex<InFlight>,
}

impl NotificationDispatcher {
    pub fn new(
        settings: DispatchSettings,
        engine: Arc<HybridDeliveryEngine>,
        renderer: Arc<dyn TemplateRenderer>,
        store: Arc<dyn NotificationStore>,
        publisher: Arc<dyn EventPublisher>,
        dedup: Arc<dyn DedupStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            composer: Composer::new(&settings.app_base_url, &settings.company_name),
            settings,
            engine,
            renderer,
            store,
            publisher,
            dedup,
            limiter,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Handle one event of `kind`.
    ///
    /// A payload that does not decode is logged and accepted: redelivery
    /// cannot fix it. Only a retryable delivery failure returns `Err`.
    pub async fn dispatch(&self, kind: EventKind, envelope: &EventEnvelope) -> Result<(), WorkerError> {
        let event = match HrEvent::parse(kind, envelope) {
            Ok(event) => event,
            Err(e) => {
                error!(
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    handler = kind.name(),
                    error = %e,
                    "Payload does not match its topic, dropping"
                );
                counter!("notifications_invalid_payload_total", "handler" => kind.name())
                    .increment(1);
                return Ok(());
            }
        };

        if let HrEvent::SalaryIncrementDue(due) = &event {
            info!(
                event_id = %envelope.event_id,
                employee_id = due.employee.employee_id,
                "{}",
                salary_increment_due_summary(due)
            );
        }

        let emails = self.composer.compose(&event);
        if emails.is_empty() {
            debug!(event_id = %envelope.event_id, handler = kind.name(), "No email for event");
            return Ok(());
        }

        let mut retry = None;
        for email in &emails {
            if let Err(e) = self.deliver(envelope, email).await {
                retry.get_or_insert(e);
            }
        }

        match retry {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn deliver(&self, trigger: &EventEnvelope, email: &OutboundEmail) -> Result<(), WorkerError> {
        let key = format!(
            "{}:{}:{}",
            trigger.event_id, email.notification_type, email.recipient_email
        );

        if !self.dedup.mark_if_absent(&key, self.settings.dedup_ttl).await {
            debug!(
                event_id = %trigger.event_id,
                recipient = %email.recipient_email,
                notification_type = %email.notification_type,
                "Email already handled, skipping"
            );
            return Ok(());
        }

        let decision = self
            .limiter
            .check(
                &email.recipient_email,
                self.settings.rate_limit_max_requests,
                self.settings.rate_limit_window_seconds,
            )
            .await;
        if !decision.allowed {
            warn!(
                event_id = %trigger.event_id,
                recipient = %email.recipient_email,
                current_count = decision.current_count,
                max_requests = self.settings.rate_limit_max_requests,
                "Rate limit exceeded, skipping email"
            );
            counter!(
                "notifications_rate_limited_total",
                "type" => email.notification_type.to_string()
            )
            .increment(1);
            let message = format!(
                "Rate limit exceeded: {} emails to {} in {}s (max {})",
                decision.current_count,
                email.recipient_email,
                self.settings.rate_limit_window_seconds,
                self.settings.rate_limit_max_requests
            );
            self.publish_failed(trigger, email, message, 0).await;
            return Ok(());
        }

        let rendered = match self.renderer.render(&email.context, &email.recipient_email) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(
                    event_id = %trigger.event_id,
                    recipient = %email.recipient_email,
                    kind = %email.context.kind(),
                    error = %e,
                    "Failed to render email"
                );
                self.publish_failed(trigger, email, e.to_string(), 0).await;
                return Ok(());
            }
        };

        let mut attempts = self.attempts(&key);
        if attempts.record_id.is_none() {
            attempts.record_id = match self
                .store
                .create_pending(&email.recipient_email, &email.subject, &rendered.html)
                .await
            {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(
                        event_id = %trigger.event_id,
                        recipient = %email.recipient_email,
                        error = %e,
                        "Failed to record notification, sending anyway"
                    );
                    None
                }
            };
        }

        let message = Email::new(&email.recipient_email, &email.subject)
            .with_recipient_name(&email.recipient_name)
            .with_html(rendered.html)
            .with_text(rendered.text);

        let result = self.engine.send(&message).await;

        if result.success {
            self.forget(&key);
            self.record_status(attempts.record_id, EmailStatus::Sent, None, attempts.failed)
                .await;
            info!(
                event_id = %trigger.event_id,
                recipient = %email.recipient_email,
                notification_type = %email.notification_type,
                provider = result.provider_used.as_deref().unwrap_or("unknown"),
                used_fallback = result.used_fallback,
                "Notification sent"
            );
            counter!(
                "notifications_sent_total",
                "type" => email.notification_type.to_string()
            )
            .increment(1);
            self.publish_sent(trigger, email).await;
            return Ok(());
        }

        let reason = result
            .error
            .unwrap_or_else(|| "email delivery failed".to_string());
        attempts.failed += 1;

        if attempts.failed < self.settings.max_retries {
            self.remember(&key, attempts);
            self.record_status(
                attempts.record_id,
                EmailStatus::Retrying,
                Some(reason.clone()),
                attempts.failed,
            )
            .await;
            self.dedup.release(&key).await;
            warn!(
                event_id = %trigger.event_id,
                recipient = %email.recipient_email,
                attempt = attempts.failed,
                max_retries = self.settings.max_retries,
                error = %reason,
                "Notification delivery failed, will retry"
            );
            return Err(WorkerError::transient(format!(
                "delivery to {} failed (attempt {}/{}): {}",
                email.recipient_email, attempts.failed, self.settings.max_retries, reason
            )));
        }

        self.forget(&key);
        self.record_status(
            attempts.record_id,
            EmailStatus::Failed,
            Some(reason.clone()),
            attempts.failed,
        )
        .await;
        error!(
            event_id = %trigger.event_id,
            recipient = %email.recipient_email,
            attempts = attempts.failed,
            error = %reason,
            "Notification failed permanently"
        );
        counter!(
            "notifications_failed_total",
            "type" => email.notification_type.to_string()
        )
        .increment(1);
        self.publish_failed(trigger, email, reason, attempts.failed)
            .await;
        Ok(())
    }

    async fn record_status(
        &self,
        record_id: Option<Uuid>,
        status: EmailStatus,
        error: Option<String>,
        retry_count: u32,
    ) {
        let Some(id) = record_id else {
            return;
        };
        if let Err(e) = self.store.update_status(id, status, error, retry_count).await {
            warn!(record_id = %id, status = %status, error = %e, "Failed to update notification record");
        }
    }

    async fn publish_sent(&self, trigger: &EventEnvelope, email: &OutboundEmail) {
        match NotificationSentEvent::new(email, trigger).into_envelope(trigger) {
            Ok(envelope) => {
                if !self.publisher.publish(NOTIFICATION_SENT, &envelope).await {
                    warn!(event_id = %trigger.event_id, "Audit event not queued");
                }
            }
            Err(e) => error!(event_id = %trigger.event_id, error = %e, "Failed to build audit event"),
        }
    }

    async fn publish_failed(
        &self,
        trigger: &EventEnvelope,
        email: &OutboundEmail,
        reason: String,
        retry_count: u32,
    ) {
        match NotificationFailedEvent::new(email, trigger, reason, retry_count).into_envelope(trigger) {
            Ok(envelope) => {
                if !self.publisher.publish(NOTIFICATION_FAILED, &envelope).await {
                    warn!(event_id = %trigger.event_id, "Audit event not queued");
                }
            }
            Err(e) => error!(event_id = %trigger.event_id, error = %e, "Failed to build audit event"),
        }
    }

    fn attempts(&self, key: &str) -> Attempts {
        let now = Instant::now();
        match self.lock().get(key) {
            Some((attempts, touched)) if now.duration_since(*touched) < self.settings.dedup_ttl => {
                *attempts
            }
            _ => Attempts::default(),
        }
    }

    fn remember(&self, key: &str, attempts: Attempts) {
        let now = Instant::now();
        let ttl = self.settings.dedup_ttl;
        let mut in_flight = self.lock();
        in_flight.retain(|_, (_, touched)| now.duration_since(*touched) < ttl);
        in_flight.insert(key.to_string(), (attempts, now));
    }

    fn forget(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InFlight> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
