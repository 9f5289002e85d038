//! SMTP email provider using lettre

use super::{EmailProvider, SendResult};
use crate::models::{format_address, Email};
use async_trait::async_trait;
use core_config::{env_bool, env_or_default, env_parse, ConfigError, FromEnv};
use eyre::{Result, WrapErr};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Text part sent alongside HTML-only bodies
pub(crate) const HTML_ONLY_TEXT_FALLBACK: &str = "Please view this email in an HTML-capable client.";

/// SMTP provider configuration
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl SmtpConfig {
    /// Credentials are present
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl FromEnv for SmtpConfig {
    /// Reads:
    /// - SMTP_HOST (default: smtp.gmail.com), SMTP_PORT (default: 465)
    /// - SMTP_USERNAME or SMTP_USER
    /// - SMTP_PASSWORD or SMTP_APP_PASSWORD
    /// - SMTP_USE_TLS (default: true)
    /// - EMAIL_FROM_ADDRESS or SMTP_FROM_EMAIL (default: the username)
    /// - EMAIL_FROM_NAME or EMAIL_SERVICE_NAME (default: HRMS)
    fn from_env() -> Result<Self, ConfigError> {
        let username = first_env(&["SMTP_USERNAME", "SMTP_USER"]).unwrap_or_default();
        let password = first_env(&["SMTP_PASSWORD", "SMTP_APP_PASSWORD"]).unwrap_or_default();
        let from_email =
            first_env(&["EMAIL_FROM_ADDRESS", "SMTP_FROM_EMAIL"]).unwrap_or_else(|| username.clone());

        Ok(Self {
            host: env_or_default("SMTP_HOST", "smtp.gmail.com"),
            port: env_parse("SMTP_PORT", 465)?,
            username,
            password,
            from_email,
            from_name: first_env(&["EMAIL_FROM_NAME", "EMAIL_SERVICE_NAME"])
                .unwrap_or_else(|| "HRMS".to_string()),
            use_tls: env_bool("SMTP_USE_TLS", true)?,
        })
    }
}

/// First non-empty value among `keys`
pub(crate) fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

/// SMTP email provider
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: Arc<SmtpConfig>,
}

impl SmtpProvider {
    /// Create a new SMTP provider.
    ///
    /// With TLS, port 587 negotiates STARTTLS and any other port uses
    /// implicit TLS. Without TLS and without a username the connection is
    /// plain and unauthenticated (Mailpit/Mailhog).
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let credentials = (!config.username.is_empty())
            .then(|| Credentials::new(config.username.clone(), config.password.clone()));

        let builder = if config.use_tls && config.port == 587 {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .wrap_err("Failed to create SMTP STARTTLS relay")?
        } else if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .wrap_err("Failed to create SMTP relay")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = builder.port(config.port);
        let transport = match credentials {
            Some(credentials) => builder.credentials(credentials).build(),
            None => builder.build(),
        };

        if !config.is_configured() {
            warn!(host = %config.host, "SMTP provider created without credentials");
        }

        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        let config = SmtpConfig::from_env().wrap_err("Invalid SMTP configuration")?;
        Self::new(config)
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    fn build_message(&self, email: &Email) -> Result<Message> {
        let sender_name = email.sender_name.as_deref().unwrap_or(&self.config.from_name);
        let from: Mailbox = format_address(&self.config.from_email, Some(sender_name))
            .parse()
            .wrap_err("Invalid from address")?;

        let to: Mailbox = email.recipient().parse().wrap_err("Invalid to address")?;

        let mut builder = Message::builder().from(from).to(to).subject(&email.subject);

        if let Some(reply_to) = &email.reply_to {
            let reply_to_mailbox: Mailbox =
                reply_to.parse().wrap_err("Invalid reply-to address")?;
            builder = builder.reply_to(reply_to_mailbox);
        }

        let message = match (&email.body_text, &email.body_html) {
            (text, Some(html)) => {
                let text = text
                    .clone()
                    .unwrap_or_else(|| HTML_ONLY_TEXT_FALLBACK.to_string());
                builder
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_PLAIN)
                                    .body(text),
                            )
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(html.clone()),
                            ),
                    )
                    .wrap_err("Failed to build multipart message")?
            }
            (Some(text), None) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone())
                .wrap_err("Failed to build text message")?,
            (None, None) => {
                return Err(eyre::eyre!("Email must have either text or HTML body"));
            }
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .wrap_err("Failed to send email via SMTP")?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_else(|| email.id.clone());

        info!(
            email_id = %email.id,
            to = %email.to,
            subject = %email.subject,
            "Email sent via SMTP"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> Result<()> {
        let reachable = self
            .transport
            .test_connection()
            .await
            .wrap_err("SMTP health check failed")?;

        if !reachable {
            return Err(eyre::eyre!("SMTP server {} did not accept a connection", self.config.host));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from_email: "noreply@hrms.example.com".to_string(),
            from_name: "HRMS".to_string(),
            use_tls: false,
        }
    }

    #[test]
    fn test_smtp_config_from_env_aliases() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("mail.internal")),
                ("SMTP_PORT", Some("587")),
                ("SMTP_USERNAME", None),
                ("SMTP_USER", Some("bot@hrms.example.com")),
                ("SMTP_PASSWORD", None),
                ("SMTP_APP_PASSWORD", Some("app-secret")),
                ("EMAIL_FROM_ADDRESS", None),
                ("SMTP_FROM_EMAIL", None),
                ("SMTP_USE_TLS", Some("true")),
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert_eq!(config.host, "mail.internal");
                assert_eq!(config.port, 587);
                assert_eq!(config.username, "bot@hrms.example.com");
                assert_eq!(config.password, "app-secret");
                assert_eq!(config.from_email, "bot@hrms.example.com");
                assert!(config.is_configured());
                assert!(!format!("{:?}", config).contains("app-secret"));
            },
        );
    }

    #[test]
    fn test_smtp_config_defaults() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", None::<&str>),
                ("SMTP_PORT", None),
                ("SMTP_USERNAME", None),
                ("SMTP_USER", None),
                ("SMTP_PASSWORD", None),
                ("SMTP_APP_PASSWORD", None),
                ("SMTP_USE_TLS", None),
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert_eq!(config.host, "smtp.gmail.com");
                assert_eq!(config.port, 465);
                assert!(config.use_tls);
                assert!(!config.is_configured());
            },
        );
    }

    #[test]
    fn test_smtp_config_rejects_bad_port() {
        temp_env::with_var("SMTP_PORT", Some("smtp"), || {
            assert!(SmtpConfig::from_env().is_err());
        });
    }

    #[tokio::test]
    async fn test_build_message_adds_text_alternative() {
        let provider = SmtpProvider::new(config()).unwrap();
        let email = Email::new("jane@example.com", "Leave approved")
            .with_recipient_name("Jane Doe")
            .with_html("<p>Approved</p>");

        let message = provider.build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Leave approved"));
        assert!(raw.contains("HRMS"));
        assert!(raw.contains("noreply@hrms.example.com"));
        assert!(raw.contains(HTML_ONLY_TEXT_FALLBACK));
        assert!(raw.contains("<p>Approved</p>"));
    }

    #[tokio::test]
    async fn test_build_message_requires_body() {
        let provider = SmtpProvider::new(config()).unwrap();
        let email = Email::new("jane@example.com", "Empty");

        assert!(provider.build_message(&email).is_err());
    }

    #[tokio::test]
    async fn test_sender_name_override() {
        let provider = SmtpProvider::new(config()).unwrap();
        let email = Email::new("jane@example.com", "Hi")
            .with_text("Hello")
            .with_sender_name("People Team");

        let raw = String::from_utf8(provider.build_message(&email).unwrap().formatted()).unwrap();
        assert!(raw.contains("People Team"));
    }
}
