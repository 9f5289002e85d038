//! Email delivery for HR notifications
//!
//! ## Components
//!
//! - **Email Models**: `Email` and the `EmailStatus` record lifecycle
//! - **Providers**: AWS SES, SMTP (lettre), and a recording mock
//! - **Delivery**: `HybridDeliveryEngine` retries the primary provider, then
//!   tries the fallback once, and always answers with a `DeliveryResult`
//! - **Templates**: typed, validated contexts rendered by the Handlebars
//!   `TemplateEngine`
//!
//! ## Usage
//!
//! ```ignore
//! use email::{DeliveryPolicy, Email, HybridDeliveryEngine, SesProvider, SmtpProvider};
//!
//! let engine = HybridDeliveryEngine::new(Arc::new(SesProvider::from_env().await?), DeliveryPolicy::default())
//!     .with_fallback(Arc::new(SmtpProvider::from_env()?));
//!
//! let result = engine.send(&Email::new("jane@example.com", "Hello").with_text("Hi")).await;
//! ```

pub mod delivery;
pub mod error;
pub mod models;
pub mod provider;
pub mod templates;

pub use delivery::{
    DeliveryAttempt, DeliveryHealth, DeliveryPolicy, DeliveryResult, DeliverySettings,
    HybridDeliveryEngine, ProviderChoice, ProviderHealth, ProviderPlan,
};
pub use error::{EmailError, EmailResult};
pub use models::{Email, EmailStatus};
pub use provider::{
    EmailProvider, MockEmailProvider, ProviderKind, SendResult, SesConfig, SesProvider,
    SmtpConfig, SmtpProvider,
};
pub use templates::{
    CongratulationsContext, Detail, EmailContext, EmailKind, NotificationContext,
    ReminderContext, RenderedEmail, TemplateEngine, TemplateRenderer, Urgency, WelcomeContext,
};
