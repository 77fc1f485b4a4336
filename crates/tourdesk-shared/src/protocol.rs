//! JSON shapes exchanged between the client services and the backend.
//!
//! Chat endpoints use snake_case field names, notification endpoints use
//! camelCase; both wrap their payload in an [`ApiResponse`] envelope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NotificationDraft, NotificationFilters, Pagination};
use crate::types::{ConversationType, MessageId, MessageKind, NotificationKind, UserId};

/// `{ success, data, message }` envelope around every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationsQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    pub participants: Vec<UserId>,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessagesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    crate::constants::DEFAULT_MESSAGE_PAGE_LIMIT
}

impl Default for MessagesQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "type", default = "default_message_kind")]
    pub kind: MessageKind,
}

fn default_message_kind() -> MessageKind {
    MessageKind::Text
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRequest {
    pub user_id: UserId,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Flat query string of the notification listing endpoint.
///
/// Kept flat (rather than flattening [`NotificationFilters`] and
/// [`Pagination`]) because url-encoded deserialization cannot parse typed
/// fields through `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl NotificationQuery {
    pub fn new(filters: &NotificationFilters, pagination: Pagination) -> Self {
        Self {
            kind: filters.kind,
            category: filters.category.clone(),
            read: filters.read,
            start_date: filters.start_date,
            end_date: filters.end_date,
            page: Some(pagination.page),
            page_size: Some(pagination.page_size),
        }
    }

    pub fn filters(&self) -> NotificationFilters {
        NotificationFilters {
            kind: self.kind,
            category: self.category.clone(),
            read: self.read,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: UserId,
    #[serde(flatten)]
    pub draft: NotificationDraft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNotificationRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub user_id: UserId,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Notification;

    #[test]
    fn envelope_without_success_field_counts_as_success() {
        let resp: ApiResponse<u32> = serde_json::from_str(r#"{"data": 3}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data, Some(3));
    }

    #[test]
    fn failure_envelope_carries_message() {
        let resp: ApiResponse<Notification> =
            serde_json::from_str(r#"{"success": false, "message": "not allowed"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.message.as_deref(), Some("not allowed"));
    }

    fn decode<T: serde::de::DeserializeOwned>(body: &str) -> ApiResponse<T> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn envelope_decodes_for_any_owned_payload() {
        let empty: ApiResponse<Notification> = decode(r#"{"success": true}"#);
        assert!(empty.data.is_none());

        let ids: ApiResponse<Vec<String>> = decode(r#"{"data": ["a", "b"]}"#);
        assert_eq!(ids.data.map(|d| d.len()), Some(2));
    }

    #[test]
    fn notification_query_splits_back_into_filters() {
        let filters = NotificationFilters {
            kind: Some(NotificationKind::Error),
            read: Some(false),
            ..Default::default()
        };
        let query = NotificationQuery::new(&filters, Pagination::default());
        assert_eq!(query.filters(), filters);
        assert_eq!(query.page, Some(1));
    }
}
