//! Consumer metrics over the `metrics` facade
//!
//! No recorder is installed here; the binary decides whether to export.

use crate::worker::ProcessOutcome;
use metrics::{counter, histogram};
use std::time::Duration;

/// Consumer metrics helper, labelled by consumer group
#[derive(Clone)]
pub struct ConsumerMetrics {
    group: String,
}

impl ConsumerMetrics {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }

    pub fn message_received(&self, topic: &str) {
        counter!(
            "kafka_worker_messages_received_total",
            "group" => self.group.clone(),
            "topic" => topic.to_string()
        )
        .increment(1);
    }

    pub fn outcome(&self, topic: &str, outcome: ProcessOutcome) {
        counter!(
            "kafka_worker_messages_processed_total",
            "group" => self.group.clone(),
            "topic" => topic.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    pub fn handler_duration(&self, topic: &str, duration: Duration) {
        histogram!(
            "kafka_worker_handler_duration_seconds",
            "group" => self.group.clone(),
            "topic" => topic.to_string()
        )
        .record(duration.as_secs_f64());
    }

    pub fn handler_error(&self, topic: &str, category: &'static str) {
        counter!(
            "kafka_worker_handler_errors_total",
            "group" => self.group.clone(),
            "topic" => topic.to_string(),
            "category" => category
        )
        .increment(1);
    }

    pub fn commit_failed(&self, topic: &str) {
        counter!(
            "kafka_worker_commit_failures_total",
            "group" => self.group.clone(),
            "topic" => topic.to_string()
        )
        .increment(1);
    }
}

/// A store (`dedup` or `rate_limit`) answered by failing open
pub fn fail_open(store: &'static str) {
    counter!("kafka_worker_fail_open_total", "store" => store).increment(1);
}

/// Outcome of a producer publish
pub fn publish_result(topic: &str, success: bool) {
    let status = if success { "success" } else { "failed" };
    counter!(
        "kafka_worker_events_published_total",
        "topic" => topic.to_string(),
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder_are_noops() {
        let metrics = ConsumerMetrics::new("notification-service-consumer");
        assert_eq!(metrics.group, "notification-service-consumer");

        metrics.message_received("leave-approved");
        metrics.outcome("leave-approved", ProcessOutcome::Committed);
        metrics.handler_duration("leave-approved", Duration::from_millis(12));
        fail_open("dedup");
    }
}
