//! Integration tests for the email library

use email::{
    CongratulationsContext, DeliveryPolicy, Email, EmailContext, HybridDeliveryEngine,
    MockEmailProvider, TemplateEngine, TemplateRenderer,
};
use std::sync::Arc;
use std::time::Duration;

fn congratulations() -> EmailContext {
    CongratulationsContext::new("Jane Doe", "You have been promoted to Senior Engineer.")
        .with_achievement("Promotion to Senior Engineer")
        .with_detail("Effective date", "2026-04-01")
        .with_closing_message("Keep up the great work!")
        .into()
}

mod render_and_deliver {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rendered_email_goes_through_fallback() {
        let templates = TemplateEngine::new("HRMS").unwrap();
        let rendered = templates
            .render(&congratulations(), "jane@example.com")
            .unwrap();

        let email = Email::new("jane@example.com", "Congratulations!")
            .with_recipient_name("Jane Doe")
            .with_html(rendered.html)
            .with_text(rendered.text);

        let ses = MockEmailProvider::failing("ses");
        let smtp = MockEmailProvider::new("smtp");
        let engine = HybridDeliveryEngine::new(
            Arc::new(ses.clone()),
            DeliveryPolicy::default().with_retry_delay(Duration::from_millis(10)),
        )
        .with_fallback(Arc::new(smtp.clone()));

        let result = engine.send(&email).await;

        assert!(result.success);
        assert!(result.used_fallback);
        assert_eq!(ses.calls(), 2);

        let sent = smtp.sent_emails().await;
        assert_eq!(sent.len(), 1);
        let body = sent[0].body_html.as_deref().unwrap();
        assert!(body.contains("Promotion to Senior Engineer"));
        assert!(body.contains("Keep up the great work!"));
        assert!(sent[0].body_text.as_deref().unwrap().contains("Effective date: 2026-04-01"));
    }

    #[tokio::test]
    async fn test_single_provider_without_fallback() {
        let ses = MockEmailProvider::failing("ses");
        let engine = HybridDeliveryEngine::new(
            Arc::new(ses.clone()),
            DeliveryPolicy::default()
                .with_retry_count(1)
                .with_retry_delay(Duration::ZERO),
        );

        let result = engine
            .send(&Email::new("jane@example.com", "Hi").with_text("Hello"))
            .await;

        assert!(!result.success);
        assert!(!result.used_fallback);
        assert_eq!(ses.calls(), 1);
        assert_eq!(engine.fallback_name(), None);
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_with_failing_primary_and_healthy_fallback() {
        let engine = HybridDeliveryEngine::new(
            Arc::new(MockEmailProvider::failing("ses")),
            DeliveryPolicy::default(),
        )
        .with_fallback(Arc::new(MockEmailProvider::new("smtp")));

        let health = engine.health_check().await;
        assert!(health.can_deliver());

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["primary"], "ses");
        assert_eq!(json["fallback"], "smtp");
        assert_eq!(json["providers"][0]["healthy"], false);
    }
}
