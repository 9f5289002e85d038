//! AWS SES (Simple Email Service) provider
//!
//! Sends emails via AWS SES v2 API.
//!
//! ## Configuration
//!
//! The provider uses standard AWS SDK credential resolution:
//! - Environment variables: `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`
//! - IAM roles (EKS IRSA, EC2 instance profile)
//! - Shared credentials file
//!
//! Environment variables read by [`SesConfig::from_env`]:
//! - `AWS_SES_REGION` or `AWS_REGION` - AWS region for SES
//! - `SES_FROM_EMAIL`, `SES_SENDER_EMAIL` or `EMAIL_FROM_ADDRESS` - sender address (required)
//! - `SES_FROM_NAME`, `EMAIL_FROM_NAME` or `EMAIL_SERVICE_NAME` - sender name
//! - `SES_CONFIGURATION_SET` - configuration set for delivery tracking (optional)

use super::smtp::{first_env, HTML_ONLY_TEXT_FALLBACK};
use crate::models::{format_address, Email};
use crate::provider::{EmailProvider, SendResult};
use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client;
use core_config::{ConfigError, FromEnv};
use eyre::{eyre, Result};
use tracing::{debug, error, info};

/// SES sender settings
#[derive(Debug, Clone)]
pub struct SesConfig {
    /// Region override; the SDK default chain applies when `None`
    pub region: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub configuration_set: Option<String>,
}

impl SesConfig {
    pub fn new(from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        Self {
            region: None,
            from_email: from_email.into(),
            from_name: from_name.into(),
            configuration_set: None,
        }
    }
}

impl FromEnv for SesConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let from_email = first_env(&["SES_FROM_EMAIL", "SES_SENDER_EMAIL", "EMAIL_FROM_ADDRESS"])
            .ok_or_else(|| ConfigError::MissingEnvVar("SES_FROM_EMAIL".to_string()))?;

        Ok(Self {
            region: first_env(&["AWS_SES_REGION", "AWS_REGION"]),
            from_email,
            from_name: first_env(&["SES_FROM_NAME", "EMAIL_FROM_NAME", "EMAIL_SERVICE_NAME"])
                .unwrap_or_else(|| "HRMS".to_string()),
            configuration_set: first_env(&["SES_CONFIGURATION_SET"]),
        })
    }
}

/// AWS SES email provider
pub struct SesProvider {
    client: Client,
    config: SesConfig,
}

impl SesProvider {
    /// Create a new SesProvider with an existing AWS SES client
    pub fn new(client: Client, config: SesConfig) -> Self {
        Self { client, config }
    }

    /// Build the SDK client from the default AWS config chain
    ///
    /// Credentials resolve from environment variables, the web identity
    /// token (EKS IRSA), the instance profile or the shared credentials file.
    pub async fn from_config(config: SesConfig) -> Self {
        let mut config_loader = aws_config::from_env();

        if let Some(region) = &config.region {
            config_loader = config_loader.region(aws_config::Region::new(region.clone()));
        }

        let sdk_config = config_loader.load().await;
        info!(
            region = ?sdk_config.region(),
            from = %config.from_email,
            "SES client initialized"
        );

        Self::new(Client::new(&sdk_config), config)
    }

    /// Create from environment variables and default AWS SDK config
    pub async fn from_env() -> Result<Self> {
        let config = SesConfig::from_env().map_err(|e| eyre!("Invalid SES configuration: {}", e))?;
        Ok(Self::from_config(config).await)
    }

    fn from_address(&self, email: &Email) -> String {
        let name = email.sender_name.as_deref().unwrap_or(&self.config.from_name);
        format_address(&self.config.from_email, Some(name))
    }

    fn build_content(email: &Email) -> Result<EmailContent> {
        if !email.has_body() {
            return Err(eyre!("Email must have either text or HTML body"));
        }

        let text = email.body_text.as_deref().unwrap_or(HTML_ONLY_TEXT_FALLBACK);
        let mut body =
            Body::builder().text(Content::builder().data(text).charset("UTF-8").build()?);

        if let Some(html) = &email.body_html {
            body = body.html(Content::builder().data(html).charset("UTF-8").build()?);
        }

        let message = Message::builder()
            .subject(
                Content::builder()
                    .data(&email.subject)
                    .charset("UTF-8")
                    .build()?,
            )
            .body(body.build())
            .build();

        Ok(EmailContent::builder().simple(message).build())
    }
}

#[async_trait]
impl EmailProvider for SesProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let destination = Destination::builder().to_addresses(email.recipient()).build();
        let content = Self::build_content(email)?;
        let from_address = self.from_address(email);

        debug!(
            to = %email.to,
            subject = %email.subject,
            from = %from_address,
            "Sending email via AWS SES"
        );

        let mut request = self
            .client
            .send_email()
            .from_email_address(&from_address)
            .destination(destination)
            .content(content)
            .set_configuration_set_name(self.config.configuration_set.clone());

        if let Some(reply_to) = &email.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, to = %email.to, "AWS SES send failed");

            let err_str = e.to_string();
            if err_str.contains("Throttling") || err_str.contains("rate") {
                eyre!("rate limit exceeded: {}", e)
            } else if err_str.contains("AccessDenied") || err_str.contains("credentials") {
                eyre!("authentication failed: {}", e)
            } else if err_str.contains("ValidationError") || err_str.contains("InvalidParameter") {
                eyre!("invalid request: {}", e)
            } else {
                eyre!("SES error: {}", e)
            }
        })?;

        let message_id = response.message_id().unwrap_or(&email.id).to_string();

        info!(
            message_id = %message_id,
            to = %email.to,
            "Email sent via AWS SES"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> Result<()> {
        // GetAccount confirms credentials and SES access in one call
        let account = self
            .client
            .get_account()
            .send()
            .await
            .map_err(|e| eyre!("AWS SES health check failed: {}", e))?;

        if !account.sending_enabled() {
            return Err(eyre!("AWS SES sending is disabled for this account"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ses"
    }
}
