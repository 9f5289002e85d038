//! Hybrid email delivery: a primary provider with bounded retries, then one
//! attempt on the fallback provider.
//!
//! The engine never returns an error. Every call ends in a [`DeliveryResult`]
//! and provider failures below full exhaustion are only logged.

use crate::error::{EmailError, EmailResult};
use crate::models::Email;
use crate::provider::{EmailProvider, ProviderKind, SendResult};
use core_config::{env_bool, env_or_default, env_parse, ConfigError, FromEnv};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::{error, info, warn};

/// Which providers the deployment sends through (`EMAIL_PROVIDER`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderChoice {
    /// SES only
    Ses,
    /// SMTP only
    Smtp,
    /// SES primary, SMTP fallback
    #[default]
    Hybrid,
}

/// Roles of the configured providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPlan {
    pub primary: ProviderKind,
    pub fallback: Option<ProviderKind>,
}

/// Retry and fallback knobs for one `send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Attempts on the primary provider; `0` is treated as `1`
    pub retry_count: u32,
    /// Pause between primary attempts
    pub retry_delay: Duration,
    pub fallback_enabled: bool,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 2,
            retry_delay: Duration::from_secs(1),
            fallback_enabled: true,
        }
    }
}

impl DeliveryPolicy {
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    fn primary_attempts(&self) -> u32 {
        self.retry_count.max(1)
    }
}

/// Delivery configuration read from the environment
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub provider: ProviderChoice,
    pub fallback_enabled: bool,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub ses_enabled: bool,
    pub smtp_enabled: bool,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        let policy = DeliveryPolicy::default();
        Self {
            provider: ProviderChoice::default(),
            fallback_enabled: policy.fallback_enabled,
            retry_count: policy.retry_count,
            retry_delay: policy.retry_delay,
            ses_enabled: true,
            smtp_enabled: true,
        }
    }
}

impl FromEnv for DeliverySettings {
    /// Reads:
    /// - EMAIL_PROVIDER (`ses`, `smtp` or `hybrid`; default: hybrid)
    /// - ENABLE_FALLBACK (default: true)
    /// - FALLBACK_RETRY_COUNT (default: 2)
    /// - FALLBACK_RETRY_DELAY_MS (default: 1000)
    /// - SES_ENABLED / SMTP_ENABLED (default: true)
    fn from_env() -> Result<Self, ConfigError> {
        let raw_provider = env_or_default("EMAIL_PROVIDER", "hybrid");
        let provider = raw_provider
            .trim()
            .parse::<ProviderChoice>()
            .map_err(|_| ConfigError::ParseError {
                key: "EMAIL_PROVIDER".to_string(),
                details: format!("'{}' is not one of ses, smtp, hybrid", raw_provider),
            })?;

        let defaults = Self::default();
        let retry_delay_ms: u64 = env_parse(
            "FALLBACK_RETRY_DELAY_MS",
            defaults.retry_delay.as_millis() as u64,
        )?;

        Ok(Self {
            provider,
            fallback_enabled: env_bool("ENABLE_FALLBACK", defaults.fallback_enabled)?,
            retry_count: env_parse("FALLBACK_RETRY_COUNT", defaults.retry_count)?,
            retry_delay: Duration::from_millis(retry_delay_ms),
            ses_enabled: env_bool("SES_ENABLED", defaults.ses_enabled)?,
            smtp_enabled: env_bool("SMTP_ENABLED", defaults.smtp_enabled)?,
        })
    }
}

impl DeliverySettings {
    pub fn policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            retry_count: self.retry_count,
            retry_delay: self.retry_delay,
            fallback_enabled: self.fallback_enabled,
        }
    }

    /// Resolve primary and fallback providers.
    ///
    /// `ses` and `smtp` are single-provider modes. `hybrid` degrades to a
    /// single provider when one side is disabled. Whether the fallback is
    /// used at send time is decided by the policy.
    pub fn plan(&self) -> EmailResult<ProviderPlan> {
        let plan = match (self.provider, self.ses_enabled, self.smtp_enabled) {
            (ProviderChoice::Ses, true, _) => ProviderPlan {
                primary: ProviderKind::Ses,
                fallback: None,
            },
            (ProviderChoice::Smtp, _, true) => ProviderPlan {
                primary: ProviderKind::Smtp,
                fallback: None,
            },
            (ProviderChoice::Hybrid, true, smtp) => ProviderPlan {
                primary: ProviderKind::Ses,
                fallback: smtp.then_some(ProviderKind::Smtp),
            },
            (ProviderChoice::Hybrid, false, true) => ProviderPlan {
                primary: ProviderKind::Smtp,
                fallback: None,
            },
            (choice, _, _) => {
                return Err(EmailError::Config(ConfigError::Invalid(format!(
                    "EMAIL_PROVIDER={} but no matching provider is enabled",
                    choice
                ))));
            }
        };

        Ok(plan)
    }
}

/// One provider call. Lives only for the duration of a `send`.
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub provider: &'static str,
    pub attempt_number: u32,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Outcome of a delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub provider_used: Option<String>,
    pub used_fallback: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryResult {
    fn delivered(provider: &str, sent: SendResult, used_fallback: bool) -> Self {
        Self {
            success: true,
            provider_used: Some(provider.to_string()),
            used_fallback,
            message_id: Some(sent.message_id),
            error: None,
        }
    }

    fn exhausted(recipient: &str, attempts: &[DeliveryAttempt]) -> Self {
        let details = attempts
            .iter()
            .filter_map(|a| {
                a.error
                    .as_ref()
                    .map(|e| format!("{} attempt {}: {}", a.provider, a.attempt_number, e))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            success: false,
            provider_used: None,
            used_fallback: false,
            message_id: None,
            error: Some(format!("All email providers failed for {}: {}", recipient, details)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: &'static str,
    pub healthy: bool,
    pub error: Option<String>,
}

/// Health of the configured providers
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryHealth {
    pub primary: &'static str,
    pub fallback: Option<&'static str>,
    pub fallback_enabled: bool,
    pub providers: Vec<ProviderHealth>,
}

impl DeliveryHealth {
    /// At least one provider the policy would use is reachable
    pub fn can_deliver(&self) -> bool {
        self.providers.iter().any(|p| {
            p.healthy && (p.name == self.primary || (self.fallback_enabled && Some(p.name) == self.fallback))
        })
    }
}

/// Orchestrates a primary and an optional fallback provider
pub struct HybridDeliveryEngine {
    primary: Arc<dyn EmailProvider>,
    fallback: Option<Arc<dyn EmailProvider>>,
    policy: DeliveryPolicy,
}

impl HybridDeliveryEngine {
    pub fn new(primary: Arc<dyn EmailProvider>, policy: DeliveryPolicy) -> Self {
        Self {
            primary,
            fallback: None,
            policy,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn EmailProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn policy(&self) -> &DeliveryPolicy {
        &self.policy
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&'static str> {
        self.fallback.as_ref().map(|p| p.name())
    }

    /// Send with the engine's configured policy
    pub async fn send(&self, email: &Email) -> DeliveryResult {
        self.send_with_policy(email, &self.policy).await
    }

    pub async fn send_with_policy(&self, email: &Email, policy: &DeliveryPolicy) -> DeliveryResult {
        let mut attempts = Vec::new();
        let primary_attempts = policy.primary_attempts();

        for attempt_number in 1..=primary_attempts {
            if let Some(sent) =
                attempt(self.primary.as_ref(), attempt_number, email, &mut attempts).await
            {
                info!(
                    email_id = %email.id,
                    to = %email.to,
                    provider = self.primary.name(),
                    attempt = attempt_number,
                    "Email delivered"
                );
                return DeliveryResult::delivered(self.primary.name(), sent, false);
            }

            if attempt_number < primary_attempts {
                tokio::time::sleep(policy.retry_delay).await;
            }
        }

        if let Some(fallback) = self.fallback.as_ref().filter(|_| policy.fallback_enabled) {
            info!(
                email_id = %email.id,
                to = %email.to,
                primary = self.primary.name(),
                fallback = fallback.name(),
                "Primary provider exhausted, trying fallback"
            );
            counter!("email_delivery_fallback_total", "provider" => fallback.name()).increment(1);

            if let Some(sent) = attempt(fallback.as_ref(), 1, email, &mut attempts).await {
                info!(
                    email_id = %email.id,
                    to = %email.to,
                    provider = fallback.name(),
                    "Email delivered via fallback"
                );
                return DeliveryResult::delivered(fallback.name(), sent, true);
            }
        }

        let result = DeliveryResult::exhausted(&email.to, &attempts);
        error!(
            email_id = %email.id,
            to = %email.to,
            attempts = attempts.len(),
            error = result.error.as_deref().unwrap_or_default(),
            "Email delivery failed on every provider"
        );
        counter!("email_deliveries_exhausted_total").increment(1);
        result
    }

    /// Probe every configured provider
    pub async fn health_check(&self) -> DeliveryHealth {
        let mut providers = vec![probe(self.primary.as_ref()).await];
        if let Some(fallback) = &self.fallback {
            providers.push(probe(fallback.as_ref()).await);
        }

        DeliveryHealth {
            primary: self.primary.name(),
            fallback: self.fallback_name(),
            fallback_enabled: self.policy.fallback_enabled,
            providers,
        }
    }
}

async fn attempt(
    provider: &dyn EmailProvider,
    attempt_number: u32,
    email: &Email,
    attempts: &mut Vec<DeliveryAttempt>,
) -> Option<SendResult> {
    let started = tokio::time::Instant::now();
    let outcome = provider.send(email).await;
    histogram!("email_delivery_duration_seconds", "provider" => provider.name())
        .record(started.elapsed().as_secs_f64());

    let (sent, error) = match outcome {
        Ok(sent) => (Some(sent), None),
        Err(e) => {
            let message = format!("{:#}", e);
            warn!(
                email_id = %email.id,
                provider = provider.name(),
                attempt = attempt_number,
                error = %message,
                "Email delivery attempt failed"
            );
            (None, Some(message))
        }
    };

    let status = if sent.is_some() { "success" } else { "failure" };
    counter!(
        "email_delivery_attempts_total",
        "provider" => provider.name(),
        "outcome" => status
    )
    .increment(1);

    attempts.push(DeliveryAttempt {
        provider: provider.name(),
        attempt_number,
        succeeded: sent.is_some(),
        error,
    });
    sent
}

async fn probe(provider: &dyn EmailProvider) -> ProviderHealth {
    match provider.health_check().await {
        Ok(()) => ProviderHealth {
            name: provider.name(),
            healthy: true,
            error: None,
        },
        Err(e) => ProviderHealth {
            name: provider.name(),
            healthy: false,
            error: Some(format!("{:#}", e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockEmailProvider;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Provider {}

        #[async_trait]
        impl EmailProvider for Provider {
            async fn send(&self, email: &Email) -> eyre::Result<SendResult>;
            async fn health_check(&self) -> eyre::Result<()>;
            fn name(&self) -> &'static str;
        }
    }

    fn email() -> Email {
        Email::new("jane@example.com", "Leave approved").with_html("<p>Approved</p>")
    }

    fn engine(primary: &MockEmailProvider, fallback: &MockEmailProvider) -> HybridDeliveryEngine {
        HybridDeliveryEngine::new(Arc::new(primary.clone()), DeliveryPolicy::default())
            .with_fallback(Arc::new(fallback.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_after_primary_exhausted() {
        let primary = MockEmailProvider::failing_first("ses", 2);
        let fallback = MockEmailProvider::new("smtp");
        let started = tokio::time::Instant::now();

        let result = engine(&primary, &fallback).send(&email()).await;

        assert!(result.success);
        assert!(result.used_fallback);
        assert_eq!(result.provider_used.as_deref(), Some("smtp"));
        assert!(result.message_id.unwrap().starts_with("smtp-"));
        assert_eq!(primary.calls(), 2);
        assert_eq!(fallback.calls(), 1);
        // one pause between the two primary attempts, none before the fallback
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_succeeds_on_last_attempt() {
        let primary = MockEmailProvider::failing_first("ses", 1);
        let fallback = MockEmailProvider::new("smtp");

        let result = engine(&primary, &fallback).send(&email()).await;

        assert!(result.success);
        assert!(!result.used_fallback);
        assert_eq!(result.provider_used.as_deref(), Some("ses"));
        assert_eq!(primary.calls(), 2);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_providers_fail() {
        let primary = MockEmailProvider::failing("ses");
        let fallback = MockEmailProvider::failing("smtp");

        let result = engine(&primary, &fallback).send(&email()).await;

        assert!(!result.success);
        assert_eq!(result.provider_used, None);
        let error = result.error.unwrap();
        assert!(error.contains("jane@example.com"));
        assert!(error.contains("ses attempt 1"));
        assert!(error.contains("ses attempt 2"));
        assert!(error.contains("smtp attempt 1"));
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_override_disables_fallback() {
        let primary = MockEmailProvider::failing("ses");
        let fallback = MockEmailProvider::new("smtp");
        let policy = DeliveryPolicy::default()
            .with_retry_count(3)
            .with_fallback(false);

        let result = engine(&primary, &fallback)
            .send_with_policy(&email(), &policy)
            .await;

        assert!(!result.success);
        assert_eq!(primary.calls(), 3);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retry_count_still_attempts_once() {
        let primary = MockEmailProvider::new("ses");
        let engine = HybridDeliveryEngine::new(
            Arc::new(primary.clone()),
            DeliveryPolicy::default().with_retry_count(0),
        );

        let result = engine.send(&email()).await;

        assert!(result.success);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_health_check_reports_each_provider() {
        let mut primary = MockProvider::new();
        primary.expect_name().return_const("ses");
        primary
            .expect_health_check()
            .times(1)
            .returning(|| Err(eyre::eyre!("credentials expired")));

        let mut fallback = MockProvider::new();
        fallback.expect_name().return_const("smtp");
        fallback.expect_health_check().times(1).returning(|| Ok(()));

        let engine = HybridDeliveryEngine::new(Arc::new(primary), DeliveryPolicy::default())
            .with_fallback(Arc::new(fallback));

        let health = engine.health_check().await;

        assert_eq!(health.primary, "ses");
        assert_eq!(health.fallback, Some("smtp"));
        assert!(health.fallback_enabled);
        assert!(!health.providers[0].healthy);
        assert!(health.providers[0].error.as_deref().unwrap().contains("credentials"));
        assert!(health.providers[1].healthy);
        assert!(health.can_deliver());
    }

    #[test]
    fn test_settings_from_env() {
        temp_env::with_vars(
            [
                ("EMAIL_PROVIDER", Some("SMTP")),
                ("ENABLE_FALLBACK", Some("false")),
                ("FALLBACK_RETRY_COUNT", Some("4")),
                ("FALLBACK_RETRY_DELAY_MS", Some("250")),
                ("SES_ENABLED", None),
                ("SMTP_ENABLED", None),
            ],
            || {
                let settings = DeliverySettings::from_env().unwrap();
                assert_eq!(settings.provider, ProviderChoice::Smtp);
                let policy = settings.policy();
                assert_eq!(policy.retry_count, 4);
                assert_eq!(policy.retry_delay, Duration::from_millis(250));
                assert!(!policy.fallback_enabled);
            },
        );
    }

    #[test]
    fn test_settings_rejects_unknown_provider() {
        temp_env::with_var("EMAIL_PROVIDER", Some("carrier-pigeon"), || {
            let err = DeliverySettings::from_env().unwrap_err();
            assert!(err.to_string().contains("EMAIL_PROVIDER"));
        });
    }

    #[test]
    fn test_provider_plan() {
        let hybrid = DeliverySettings::default();
        assert_eq!(
            hybrid.plan().unwrap(),
            ProviderPlan {
                primary: ProviderKind::Ses,
                fallback: Some(ProviderKind::Smtp)
            }
        );

        let ses_disabled = DeliverySettings {
            ses_enabled: false,
            ..DeliverySettings::default()
        };
        assert_eq!(ses_disabled.plan().unwrap().primary, ProviderKind::Smtp);
        assert_eq!(ses_disabled.plan().unwrap().fallback, None);

        let ses_only = DeliverySettings {
            provider: ProviderChoice::Ses,
            ..DeliverySettings::default()
        };
        assert_eq!(ses_only.plan().unwrap().fallback, None);

        let nothing = DeliverySettings {
            provider: ProviderChoice::Smtp,
            smtp_enabled: false,
            ..DeliverySettings::default()
        };
        assert!(nothing.plan().is_err());
    }
}
