//! Typed contexts for the four email templates
//!
//! A context is validated before it reaches Handlebars, so a template never
//! renders with an empty name or a malformed link.

use crate::error::EmailResult;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::Validate;

/// Email template kinds
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmailKind {
    Welcome,
    Notification,
    Reminder,
    Congratulations,
}

impl EmailKind {
    /// Button label when the context sets a URL but no text
    pub fn default_action_text(&self) -> &'static str {
        match self {
            Self::Welcome => "Get Started",
            Self::Notification | Self::Congratulations => "View Details",
            Self::Reminder => "Take Action Now",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

/// One row of the details table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct Detail {
    #[validate(length(min = 1, max = 100))]
    pub label: String,
    #[validate(length(max = 1000))]
    pub value: String,
}

impl Detail {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct WelcomeContext {
    #[validate(length(min = 1, max = 200))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub start_date: Option<String>,
    #[validate(url)]
    pub action_url: Option<String>,
    pub action_text: Option<String>,
}

impl WelcomeContext {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            employee_id: None,
            department: None,
            role: None,
            start_date: None,
            action_url: None,
            action_text: None,
        }
    }

    pub fn with_action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NotificationContext {
    #[validate(length(min = 1, max = 200))]
    pub username: String,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1))]
    pub message: String,
    /// Heading inside the body; the title when unset
    pub notification_title: Option<String>,
    #[validate(length(max = 25), nested)]
    pub details: Vec<Detail>,
    #[validate(url)]
    pub action_url: Option<String>,
    pub action_text: Option<String>,
}

impl NotificationContext {
    pub fn new(
        username: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            title: title.into(),
            message: message.into(),
            notification_title: None,
            details: Vec::new(),
            action_url: None,
            action_text: None,
        }
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(Detail::new(label, value));
        self
    }

    pub fn with_action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ReminderContext {
    #[validate(length(min = 1, max = 200))]
    pub username: String,
    #[validate(length(min = 1, max = 300))]
    pub reminder_title: String,
    #[validate(length(min = 1))]
    pub reminder_message: String,
    pub due_date: Option<String>,
    pub urgency: Option<Urgency>,
    #[validate(length(max = 25), nested)]
    pub details: Vec<Detail>,
    #[validate(url)]
    pub action_url: Option<String>,
    pub action_text: Option<String>,
}

impl ReminderContext {
    pub fn new(
        username: impl Into<String>,
        reminder_title: impl Into<String>,
        reminder_message: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            reminder_title: reminder_title.into(),
            reminder_message: reminder_message.into(),
            due_date: None,
            urgency: None,
            details: Vec::new(),
            action_url: None,
            action_text: None,
        }
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(Detail::new(label, value));
        self
    }

    pub fn with_action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CongratulationsContext {
    #[validate(length(min = 1, max = 200))]
    pub recipient_name: String,
    #[validate(length(min = 1))]
    pub message: String,
    pub achievement: Option<String>,
    #[validate(length(max = 25), nested)]
    pub details: Vec<Detail>,
    #[validate(url)]
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub closing_message: Option<String>,
}

impl CongratulationsContext {
    pub fn new(recipient_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            message: message.into(),
            achievement: None,
            details: Vec::new(),
            action_url: None,
            action_text: None,
            closing_message: None,
        }
    }

    pub fn with_achievement(mut self, achievement: impl Into<String>) -> Self {
        self.achievement = Some(achievement.into());
        self
    }

    pub fn with_closing_message(mut self, closing: impl Into<String>) -> Self {
        self.closing_message = Some(closing.into());
        self
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(Detail::new(label, value));
        self
    }

    pub fn with_action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }
}

/// Context for exactly one template kind
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EmailContext {
    Welcome(WelcomeContext),
    Notification(NotificationContext),
    Reminder(ReminderContext),
    Congratulations(CongratulationsContext),
}

impl EmailContext {
    pub fn kind(&self) -> EmailKind {
        match self {
            Self::Welcome(_) => EmailKind::Welcome,
            Self::Notification(_) => EmailKind::Notification,
            Self::Reminder(_) => EmailKind::Reminder,
            Self::Congratulations(_) => EmailKind::Congratulations,
        }
    }

    pub fn validate(&self) -> EmailResult<()> {
        match self {
            Self::Welcome(ctx) => ctx.validate()?,
            Self::Notification(ctx) => ctx.validate()?,
            Self::Reminder(ctx) => ctx.validate()?,
            Self::Congratulations(ctx) => ctx.validate()?,
        }
        Ok(())
    }

    /// Display name of the person addressed
    pub fn recipient_name(&self) -> &str {
        match self {
            Self::Welcome(ctx) => &ctx.username,
            Self::Notification(ctx) => &ctx.username,
            Self::Reminder(ctx) => &ctx.username,
            Self::Congratulations(ctx) => &ctx.recipient_name,
        }
    }

    pub fn action_url(&self) -> Option<&str> {
        match self {
            Self::Welcome(ctx) => ctx.action_url.as_deref(),
            Self::Notification(ctx) => ctx.action_url.as_deref(),
            Self::Reminder(ctx) => ctx.action_url.as_deref(),
            Self::Congratulations(ctx) => ctx.action_url.as_deref(),
        }
    }
}

impl From<WelcomeContext> for EmailContext {
    fn from(ctx: WelcomeContext) -> Self {
        Self::Welcome(ctx)
    }
}

impl From<NotificationContext> for EmailContext {
    fn from(ctx: NotificationContext) -> Self {
        Self::Notification(ctx)
    }
}

impl From<ReminderContext> for EmailContext {
    fn from(ctx: ReminderContext) -> Self {
        Self::Reminder(ctx)
    }
}

impl From<CongratulationsContext> for EmailContext {
    fn from(ctx: CongratulationsContext) -> Self {
        Self::Congratulations(ctx)
    }
}
