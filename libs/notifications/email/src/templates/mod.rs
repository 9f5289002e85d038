//! Email template rendering with Handlebars
//!
//! This module provides:
//! - Typed, validated contexts (`context`)
//! - `TemplateRenderer`: the seam handlers render through
//! - `TemplateEngine`: Handlebars renderer with the four built-in templates

pub mod context;

pub use context::{
    CongratulationsContext, Detail, EmailContext, EmailKind, NotificationContext,
    ReminderContext, Urgency, WelcomeContext,
};

use crate::error::{EmailError, EmailResult};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

/// Rendered bodies of one email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Renders a typed context into HTML and plain text
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, context: &EmailContext, recipient_email: &str) -> EmailResult<RenderedEmail>;
}

#[derive(Serialize)]
struct TemplateData<'a> {
    #[serde(flatten)]
    context: &'a EmailContext,
    company_name: &'a str,
    recipient_email: &'a str,
    default_action_text: &'static str,
    year: i32,
}

/// `2026-03-01` → `March 01, 2026`; anything unparseable passes through
fn format_date_value(value: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.format("%B %d, %Y").to_string();
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return timestamp.format("%B %d, %Y").to_string();
    }
    value.to_string()
}

handlebars_helper!(format_date: |value: str| format_date_value(value));

/// Handlebars-based template engine
///
/// HTML templates escape every variable. The plain-text alternative uses a
/// second registry with escaping off.
pub struct TemplateEngine {
    html: Handlebars<'static>,
    text: Handlebars<'static>,
    company_name: String,
}

impl TemplateEngine {
    /// Create an engine with the built-in templates
    pub fn new(company_name: impl Into<String>) -> EmailResult<Self> {
        let mut html = Handlebars::new();
        html.set_strict_mode(false);
        html.register_helper("format_date", Box::new(format_date));
        html.register_partial("header", HTML_HEADER)?;
        html.register_partial("footer", HTML_FOOTER)?;
        html.register_partial("details", HTML_DETAILS)?;
        html.register_partial("action", HTML_ACTION)?;

        let mut text = Handlebars::new();
        text.register_escape_fn(no_escape);
        text.register_helper("format_date", Box::new(format_date));
        text.register_partial("details", TEXT_DETAILS)?;
        text.register_partial("action", TEXT_ACTION)?;

        for kind in EmailKind::iter() {
            let (html_source, text_source) = sources(kind);
            html.register_template_string(kind.as_ref(), html_source)?;
            text.register_template_string(kind.as_ref(), text_source)?;
        }

        Ok(Self {
            html,
            text,
            company_name: company_name.into(),
        })
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn has_template(&self, kind: EmailKind) -> bool {
        self.html.has_template(kind.as_ref()) && self.text.has_template(kind.as_ref())
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(&self, context: &EmailContext, recipient_email: &str) -> EmailResult<RenderedEmail> {
        context.validate()?;

        let kind = context.kind();
        let data = TemplateData {
            context,
            company_name: &self.company_name,
            recipient_email,
            default_action_text: kind.default_action_text(),
            year: Utc::now().year(),
        };

        let html = self.html.render(kind.as_ref(), &data)?;
        let text = self.text.render(kind.as_ref(), &data)?;
        debug!(template = %kind, "Template rendered");

        if html.trim().is_empty() {
            return Err(EmailError::Template(format!("template '{}' rendered empty", kind)));
        }

        Ok(RenderedEmail {
            html,
            text: text.trim().to_string(),
        })
    }
}

fn sources(kind: EmailKind) -> (&'static str, &'static str) {
    match kind {
        EmailKind::Welcome => (WELCOME_HTML, WELCOME_TEXT),
        EmailKind::Notification => (NOTIFICATION_HTML, NOTIFICATION_TEXT),
        EmailKind::Reminder => (REMINDER_HTML, REMINDER_TEXT),
        EmailKind::Congratulations => (CONGRATULATIONS_HTML, CONGRATULATIONS_TEXT),
    }
}

const HTML_HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; background: #f4f5f7; margin: 0; padding: 24px;">
<div style="max-width: 600px; margin: 0 auto; background: #ffffff; border-radius: 8px; padding: 32px;">
    <p style="color: #2563eb; font-weight: bold; font-size: 18px; margin-top: 0;">{{company_name}}</p>"#;

const HTML_FOOTER: &str = r#"    <hr style="border: none; border-top: 1px solid #e5e7eb; margin: 32px 0 16px;">
    <p style="color: #9ca3af; font-size: 12px;">This email was sent to {{recipient_email}} by {{company_name}}.<br>&copy; {{year}} {{company_name}}. All rights reserved.</p>
</div>
</body>
</html>"#;

const HTML_DETAILS: &str = r#"{{#if details}}
    <table style="width: 100%; border-collapse: collapse; margin: 16px 0;">
    {{#each details}}
        <tr>
            <td style="padding: 8px; border-bottom: 1px solid #e5e7eb; color: #6b7280; width: 40%;">{{label}}</td>
            <td style="padding: 8px; border-bottom: 1px solid #e5e7eb;">{{value}}</td>
        </tr>
    {{/each}}
    </table>
{{/if}}"#;

const HTML_ACTION: &str = r#"{{#if action_url}}
    <p style="text-align: center; margin: 30px 0;">
        <a href="{{action_url}}"
           style="background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">
            {{#if action_text}}{{action_text}}{{else}}{{default_action_text}}{{/if}}
        </a>
    </p>
{{/if}}"#;

const TEXT_DETAILS: &str = r#"{{#each details}}
{{label}}: {{value}}
{{/each}}"#;

const TEXT_ACTION: &str = r#"{{#if action_url}}
{{#if action_text}}{{action_text}}{{else}}{{default_action_text}}{{/if}}: {{action_url}}
{{/if}}"#;

const WELCOME_HTML: &str = r#"{{> header}}
    <h1 style="color: #111827;">Welcome, {{username}}!</h1>
    <p>We're excited to have you join <strong>{{company_name}}</strong>. Your account is ready.</p>
    <table style="width: 100%; border-collapse: collapse; margin: 16px 0;">
        <tr><td style="padding: 8px; color: #6b7280; width: 40%;">Email</td><td style="padding: 8px;">{{email}}</td></tr>
        {{#if employee_id}}<tr><td style="padding: 8px; color: #6b7280;">Employee ID</td><td style="padding: 8px;">{{employee_id}}</td></tr>{{/if}}
        {{#if department}}<tr><td style="padding: 8px; color: #6b7280;">Department</td><td style="padding: 8px;">{{department}}</td></tr>{{/if}}
        {{#if role}}<tr><td style="padding: 8px; color: #6b7280;">Role</td><td style="padding: 8px;">{{role}}</td></tr>{{/if}}
        {{#if start_date}}<tr><td style="padding: 8px; color: #6b7280;">Start date</td><td style="padding: 8px;">{{format_date start_date}}</td></tr>{{/if}}
    </table>
{{> action}}
    <p>Best regards,<br>The {{company_name}} Team</p>
{{> footer}}"#;

const WELCOME_TEXT: &str = r#"Welcome, {{username}}!

We're excited to have you join {{company_name}}. Your account is ready.

Email: {{email}}
{{#if employee_id}}Employee ID: {{employee_id}}
{{/if}}{{#if department}}Department: {{department}}
{{/if}}{{#if role}}Role: {{role}}
{{/if}}{{#if start_date}}Start date: {{format_date start_date}}
{{/if}}{{> action}}
Best regards,
The {{company_name}} Team"#;

const NOTIFICATION_HTML: &str = r#"{{> header}}
    <h1 style="color: #111827;">{{#if notification_title}}{{notification_title}}{{else}}{{title}}{{/if}}</h1>
    <p>Hello {{username}},</p>
    <p>{{message}}</p>
{{> details}}
{{> action}}
    <p>Best regards,<br>The {{company_name}} Team</p>
{{> footer}}"#;

const NOTIFICATION_TEXT: &str = r#"{{#if notification_title}}{{notification_title}}{{else}}{{title}}{{/if}}

Hello {{username}},

{{message}}
{{> details}}{{> action}}
Best regards,
The {{company_name}} Team"#;

const REMINDER_HTML: &str = r#"{{> header}}
    <h1 style="color: #111827;">{{reminder_title}}</h1>
    {{#if urgency}}<p style="display: inline-block; padding: 4px 12px; border-radius: 12px; background: #fef3c7; color: #92400e; font-size: 12px; text-transform: uppercase;">{{urgency}} priority</p>{{/if}}
    <p>Hello {{username}},</p>
    <p>{{reminder_message}}</p>
    {{#if due_date}}<p><strong>Due:</strong> {{format_date due_date}}</p>{{/if}}
{{> details}}
{{> action}}
    <p>Best regards,<br>The {{company_name}} Team</p>
{{> footer}}"#;

const REMINDER_TEXT: &str = r#"{{reminder_title}}{{#if urgency}} [{{urgency}} priority]{{/if}}

Hello {{username}},

{{reminder_message}}
{{#if due_date}}
Due: {{format_date due_date}}
{{/if}}{{> details}}{{> action}}
Best regards,
The {{company_name}} Team"#;

const CONGRATULATIONS_HTML: &str = r#"{{> header}}
    <h1 style="color: #111827;">Congratulations, {{recipient_name}}!</h1>
    {{#if achievement}}<p style="font-size: 18px; color: #059669;"><strong>{{achievement}}</strong></p>{{/if}}
    <p>{{message}}</p>
{{> details}}
{{> action}}
    {{#if closing_message}}<p>{{closing_message}}</p>{{/if}}
    <p>Warm regards,<br>The {{company_name}} Team</p>
{{> footer}}"#;

const CONGRATULATIONS_TEXT: &str = r#"Congratulations, {{recipient_name}}!
{{#if achievement}}
{{achievement}}
{{/if}}
{{message}}
{{> details}}{{> action}}{{#if closing_message}}
{{closing_message}}
{{/if}}
Warm regards,
The {{company_name}} Team"#;
