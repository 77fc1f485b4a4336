//! Built-in notification templates with `{placeholder}` substitution.

use std::collections::BTreeMap;

use tourdesk_shared::models::NotificationDraft;
use tourdesk_shared::types::NotificationKind;
use tourdesk_shared::ModelError;

#[derive(Debug, Clone, Copy)]
pub struct NotificationTemplate {
    pub id: &'static str,
    pub kind: NotificationKind,
    pub category: &'static str,
    pub title: &'static str,
    pub message: &'static str,
    pub action_url: Option<&'static str>,
}

pub const TEMPLATES: &[NotificationTemplate] = &[
    NotificationTemplate {
        id: "booking-confirmed",
        kind: NotificationKind::Success,
        category: "booking",
        title: "Booking confirmed: {tour}",
        message: "{client} is confirmed for {tour} on {date}.",
        action_url: Some("/bookings"),
    },
    NotificationTemplate {
        id: "booking-cancelled",
        kind: NotificationKind::Warning,
        category: "booking",
        title: "Booking cancelled: {tour}",
        message: "{client} cancelled their booking for {tour}.",
        action_url: Some("/bookings"),
    },
    NotificationTemplate {
        id: "guide-assigned",
        kind: NotificationKind::Info,
        category: "agenda",
        title: "Guide assigned",
        message: "{guide} will lead {tour} on {date}.",
        action_url: Some("/agenda"),
    },
    NotificationTemplate {
        id: "tour-reminder",
        kind: NotificationKind::Info,
        category: "agenda",
        title: "Upcoming tour: {tour}",
        message: "{tour} starts at {time} from {meeting_point}.",
        action_url: Some("/agenda"),
    },
    NotificationTemplate {
        id: "payment-failed",
        kind: NotificationKind::Error,
        category: "billing",
        title: "Payment failed",
        message: "The payment for invoice {invoice} could not be processed.",
        action_url: None,
    },
];

pub fn find(id: &str) -> Option<&'static NotificationTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

impl NotificationTemplate {
    /// Fill every placeholder from `params`.
    pub fn instantiate(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<NotificationDraft, ModelError> {
        Ok(NotificationDraft {
            kind: self.kind,
            title: render(self.title, params)?,
            message: render(self.message, params)?,
            category: self.category.to_string(),
            action_url: self.action_url.map(str::to_string),
        })
    }
}

/// Replace each `{name}` in `text` with `params[name]`.
///
/// A placeholder without a matching parameter is an error. A `{` with no
/// closing brace is copied through unchanged.
pub fn render(text: &str, params: &BTreeMap<String, String>) -> Result<String, ModelError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let name = &after[..close];
        let value = params
            .get(name)
            .ok_or_else(|| ModelError::MissingTemplateParam(name.to_string()))?;
        out.push_str(value);
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
