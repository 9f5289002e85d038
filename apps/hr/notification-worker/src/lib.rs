//! HR Notification Worker
//!
//! Consumes HR domain events from Kafka and sends the matching emails.
//!
//! ## Architecture
//!
//! ```text
//! Kafka topics (leave-*, employee-*, ...)
//!   ↓ (consumer group, manual commit)
//! EventConsumer<KafkaSource>
//!   ↓ (event-level dedup in Redis)
//! EmailEventHandler -> NotificationDispatcher
//!   ↓ (rate limit, render, record)
//! HybridDeliveryEngine (SES primary, SMTP fallback)
//!   ↓
//! notification-sent / notification-failed audit topics
//! ```

use core_config::{Environment, FromEnv, KafkaConfig};
use database::redis::RedisConfig;
use domain_notifications::{
    DispatchSettings, InMemoryNotificationStore, NotificationDispatcher, build_registry,
};
use email::{
    DeliverySettings, EmailProvider, HybridDeliveryEngine, ProviderKind, SesProvider, SmtpProvider,
    TemplateEngine,
};
use eyre::{Result, WrapErr};
use kafka_worker::{
    ConsumerConfig, ConsumerMetrics, EventConsumer, EventPublisher, KafkaEventProducer,
    KafkaSource, RedisDedupStore, RedisRateLimiter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

const PRODUCER_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Build one provider from its environment section
async fn build_provider(kind: ProviderKind) -> Result<Arc<dyn EmailProvider>> {
    let provider: Arc<dyn EmailProvider> = match kind {
        ProviderKind::Ses => Arc::new(
            SesProvider::from_env()
                .await
                .wrap_err("Failed to configure SES provider")?,
        ),
        ProviderKind::Smtp => Arc::new(
            SmtpProvider::from_env().wrap_err("Failed to configure SMTP provider")?,
        ),
    };
    Ok(provider)
}

/// Run the notification worker
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Loads Kafka, Redis, delivery and dispatch settings
/// 3. Connects to Redis with retry logic
/// 4. Builds the providers selected by `EMAIL_PROVIDER`
/// 5. Starts the consumer and waits for Ctrl+C or SIGTERM
///
/// # Errors
///
/// Returns an error if any configuration is invalid, Redis stays
/// unreachable, or the Kafka clients cannot be created.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting notification worker"
    );
    info!("Environment: {:?}", environment);

    let kafka = KafkaConfig::from_env().wrap_err("Failed to load Kafka configuration")?;
    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    let delivery = DeliverySettings::from_env().wrap_err("Failed to load email delivery settings")?;
    let settings = DispatchSettings::from_env().wrap_err("Failed to load dispatch settings")?;

    info!("Connecting to Redis...");
    let redis = database::redis::connect_from_config_with_retry(&redis_config, None)
        .await
        .wrap_err("Failed to connect to Redis")?;
    info!("Connected to Redis successfully");

    let plan = delivery.plan().wrap_err("Invalid email provider selection")?;
    let mut engine = HybridDeliveryEngine::new(build_provider(plan.primary).await?, delivery.policy());
    if let Some(fallback) = plan.fallback {
        engine = engine.with_fallback(build_provider(fallback).await?);
    }
    info!(
        primary = %plan.primary,
        fallback = ?plan.fallback,
        retry_count = delivery.retry_count,
        "Email delivery configured"
    );

    let health = engine.health_check().await;
    if health.can_deliver() {
        info!(health = ?health, "Email providers reachable");
    } else {
        warn!(health = ?health, "No email provider is reachable, sends will be retried");
    }

    let renderer = TemplateEngine::new(&settings.company_name)
        .wrap_err("Failed to initialize template engine")?;
    info!("Template engine initialized");

    let producer = Arc::new(
        KafkaEventProducer::new(&kafka).wrap_err("Failed to create Kafka producer")?,
    );
    let dedup = Arc::new(RedisDedupStore::new(redis.clone()));

    let consumer_config = ConsumerConfig::default().with_dedup_ttl(settings.dedup_ttl);

    let dispatcher = Arc::new(NotificationDispatcher::new(
        settings,
        Arc::new(engine),
        Arc::new(renderer),
        Arc::new(InMemoryNotificationStore::new()),
        producer.clone(),
        dedup.clone(),
        Arc::new(RedisRateLimiter::new(redis)),
    ));

    let registry = build_registry(dispatcher).wrap_err("Failed to register event handlers")?;
    let source = KafkaSource::new(&kafka, &consumer_config, &registry.topics())
        .wrap_err("Failed to create Kafka consumer")?;

    let consumer = EventConsumer::new(source, registry, dedup, consumer_config)
        .with_metrics(ConsumerMetrics::new(kafka.consumer_group_id.clone()));
    let handle = consumer.start();
    info!(group = %kafka.consumer_group_id, "Notification worker running");

    if let Err(e) = shutdown_signal().await {
        error!("Error waiting for shutdown signal: {}", e);
    }
    info!("Shutdown signal received, stopping consumer");

    if let Err(e) = handle.stop().await {
        error!(error = %e, "Consumer did not stop cleanly");
    }

    if let Err(e) = producer.flush(PRODUCER_FLUSH_TIMEOUT).await {
        warn!(error = %e, "Producer flush did not complete");
    }

    info!("Notification worker shut down");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.wrap_err("Failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?;
        sigterm.recv().await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}
