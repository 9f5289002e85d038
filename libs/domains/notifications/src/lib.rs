//! Notifications Domain
//!
//! Turns HR domain events into emails.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Kafka topics   │  ← TOPIC_ROUTES: topic -> EventKind
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  Event handler  │  ← one per EventKind, aliases share it
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Composer      │  ← HrEvent -> OutboundEmail (typed contexts)
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Dispatcher    │  ← dedup, rate limit, render, record, deliver, audit
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ Delivery engine │  ← SES primary, SMTP fallback
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{NotificationDispatcher, build_registry};
//!
//! let dispatcher = Arc::new(NotificationDispatcher::new(
//!     settings, engine, renderer, store, producer, dedup, limiter,
//! ));
//! let registry = build_registry(dispatcher)?;
//! ```

pub mod audit;
pub mod compose;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod handler;
pub mod settings;
pub mod store;
pub mod topics;
pub mod types;

pub use audit::{NotificationFailedEvent, NotificationSentEvent};
pub use compose::{Composer, OutboundEmail};
pub use dispatch::NotificationDispatcher;
pub use error::{NotificationError, NotificationResult};
pub use events::HrEvent;
pub use handler::{EmailEventHandler, build_registry};
pub use settings::DispatchSettings;
pub use store::{InMemoryNotificationStore, NotificationRecord, NotificationStore};
pub use topics::{EventKind, TOPIC_ROUTES, subscribed_topics};
pub use types::NotificationType;
