//! Consumer -> handler -> delivery -> audit, over in-memory collaborators

use domain_notifications::topics::{NOTIFICATION_FAILED, NOTIFICATION_SENT};
use domain_notifications::{
    DispatchSettings, InMemoryNotificationStore, NotificationDispatcher, build_registry,
};
use email::{DeliveryPolicy, EmailStatus, HybridDeliveryEngine, MockEmailProvider, TemplateEngine};
use kafka_worker::{
    ConsumerConfig, EventConsumer, EventEnvelope, InMemoryDedupStore, InMemoryRateLimiter,
    InMemorySource, ManualClock, ProcessOutcome, RecordingPublisher,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Pipeline {
    consumer: EventConsumer<InMemorySource>,
    source: InMemorySource,
    provider: MockEmailProvider,
    store: Arc<InMemoryNotificationStore>,
    publisher: Arc<RecordingPublisher>,
}

fn pipeline(provider: MockEmailProvider) -> Pipeline {
    let store = Arc::new(InMemoryNotificationStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let dedup = Arc::new(InMemoryDedupStore::new());

    let engine = HybridDeliveryEngine::new(
        Arc::new(provider.clone()),
        DeliveryPolicy::default()
            .with_retry_count(1)
            .with_retry_delay(Duration::ZERO),
    );

    let dispatcher = Arc::new(NotificationDispatcher::new(
        DispatchSettings::default(),
        Arc::new(engine),
        Arc::new(TemplateEngine::new("HRMS").unwrap()),
        store.clone(),
        publisher.clone(),
        dedup.clone(),
        Arc::new(InMemoryRateLimiter::with_clock(Arc::new(ManualClock::new(0)))),
    ));

    let source = InMemorySource::new();
    let consumer = EventConsumer::new(
        source.clone(),
        build_registry(dispatcher).unwrap(),
        dedup,
        ConsumerConfig::default().with_poll_timeout(Duration::from_millis(10)),
    );

    Pipeline {
        consumer,
        source,
        provider,
        store,
        publisher,
    }
}

fn leave_approved(event_id: &str) -> Vec<u8> {
    EventEnvelope::new(
        "leave.approved",
        json!({
            "leave_id": 9,
            "employee_id": 42,
            "employee_email": "jane@example.com",
            "employee_name": "Jane Doe",
            "approved_by_id": 3,
            "approved_by_name": "Sam Lee",
            "leave_type": "annual",
            "start_date": "2026-07-01",
            "end_date": "2026-07-03",
            "days_approved": 3,
            "comments": "Enjoy!"
        }),
    )
    .with_event_id(event_id)
    .to_vec()
    .unwrap()
}

async fn poll(pipeline: &Pipeline) -> ProcessOutcome {
    pipeline.consumer.poll_once().await.unwrap().unwrap()
}

#[tokio::test]
async fn test_leave_approved_sends_once_and_audits_once() {
    let p = pipeline(MockEmailProvider::new("ses"));

    p.source.push("leave-approved", leave_approved("abc"));
    assert_eq!(poll(&p).await, ProcessOutcome::Committed);

    let sent = p.provider.sent_emails().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    assert_eq!(sent[0].subject, "Leave Request Approved");
    let html = sent[0].body_html.as_deref().unwrap();
    assert!(html.contains("Sam Lee"));
    assert!(html.contains("https://hrms.example.com/my-leaves"));

    let audit = p.publisher.published_to(NOTIFICATION_SENT);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event_type, "notification.sent");
    assert_eq!(audit[0].data["related_event_id"], "abc");
    assert_eq!(p.source.committed_offsets(), vec![0]);

    // Redelivery of the same event id
    p.source.push("leave-approved", leave_approved("abc"));
    assert_eq!(poll(&p).await, ProcessOutcome::Drop);

    assert_eq!(p.provider.sent_count().await, 1);
    assert_eq!(p.publisher.published().len(), 1);
    assert_eq!(p.source.committed_offsets(), vec![0, 1]);
}

#[tokio::test]
async fn test_alias_topic_reaches_the_same_handler() {
    let p = pipeline(MockEmailProvider::new("ses"));

    p.source
        .push("notification-leave-approved", leave_approved("alias-1"));
    assert_eq!(poll(&p).await, ProcessOutcome::Committed);
    assert!(p.provider.was_sent_to("jane@example.com").await);
}

#[tokio::test]
async fn test_failed_delivery_is_redelivered_then_committed() {
    let p = pipeline(MockEmailProvider::failing_first("ses", 1));

    p.source.push("leave-approved", leave_approved("r-1"));
    p.source.push("leave-approved", leave_approved("r-2"));

    assert_eq!(poll(&p).await, ProcessOutcome::Retry);
    assert!(p.source.committed_offsets().is_empty());
    assert_eq!(p.source.rewinds(), 1);

    assert_eq!(poll(&p).await, ProcessOutcome::Committed);
    assert_eq!(poll(&p).await, ProcessOutcome::Committed);
    assert_eq!(p.source.committed_offsets(), vec![0, 1]);

    assert_eq!(p.provider.sent_count().await, 2);
    assert_eq!(p.publisher.published_to(NOTIFICATION_SENT).len(), 2);
    assert_eq!(p.store.count_with_status(EmailStatus::Sent), 2);
    assert_eq!(p.store.records().len(), 2);
}

#[tokio::test]
async fn test_permanent_failure_is_audited_and_committed() {
    let p = pipeline(MockEmailProvider::failing("ses"));

    p.source.push("leave-approved", leave_approved("dead"));

    assert_eq!(poll(&p).await, ProcessOutcome::Retry);
    assert_eq!(poll(&p).await, ProcessOutcome::Retry);
    assert_eq!(poll(&p).await, ProcessOutcome::Committed);

    assert_eq!(p.provider.calls(), 3);
    assert_eq!(p.source.committed_offsets(), vec![0]);
    assert_eq!(p.store.count_with_status(EmailStatus::Failed), 1);

    let failed = p.publisher.published_to(NOTIFICATION_FAILED);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].data["retry_count"], 3);
    assert_eq!(failed[0].metadata.causation_id.as_deref(), Some("dead"));
}

#[tokio::test]
async fn test_unusable_messages_are_dropped() {
    let p = pipeline(MockEmailProvider::new("ses"));

    p.source.push("leave-approved", "{not json");
    p.source.push("payroll-closed", leave_approved("unrouted"));
    p.source.push(
        "leave-approved",
        EventEnvelope::new("leave.approved", json!({"leave_id": "wrong"}))
            .to_vec()
            .unwrap(),
    );

    assert_eq!(poll(&p).await, ProcessOutcome::Drop);
    assert_eq!(poll(&p).await, ProcessOutcome::Drop);
    // Decodes as an envelope but not as a leave payload: handled, nothing sent
    assert_eq!(poll(&p).await, ProcessOutcome::Committed);

    assert_eq!(p.source.committed_offsets(), vec![0, 1, 2]);
    assert_eq!(p.provider.calls(), 0);
    assert!(p.publisher.published().is_empty());
}

#[tokio::test]
async fn test_consumer_start_and_stop() {
    let p = pipeline(MockEmailProvider::new("ses"));
    p.source.push("leave-approved", leave_approved("bg-1"));

    let source = p.source.clone();
    let provider = p.provider.clone();
    let handle = p.consumer.start();

    for _ in 0..50 {
        if !source.committed_offsets().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    handle.stop().await.unwrap();
    assert_eq!(source.committed_offsets(), vec![0]);
    assert_eq!(provider.sent_count().await, 1);
}
