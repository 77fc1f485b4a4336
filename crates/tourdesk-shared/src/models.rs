//! Domain models for chat and notifications.
//!
//! Local chat state (what the client stores and renders) lives next to the
//! records the backend returns, since the client projects one into the
//! other. Every struct derives `Serialize`/`Deserialize` so it can be
//! persisted or sent over REST as-is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::types::{
    ConversationId, ConversationType, MessageId, MessageKind, MessageStatus, NotificationId,
    NotificationKind, SenderId, UserId, UserRole,
};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Message body: either literal text or a translation key rendered by the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Translated {
        key: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, serde_json::Value>,
    },
}

impl MessageContent {
    pub fn text(s: impl Into<String>) -> Self {
        MessageContent::Text(s.into())
    }

    pub fn translated(key: impl Into<String>) -> Self {
        MessageContent::Translated {
            key: key.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        match self {
            MessageContent::Translated { key, mut params } => {
                params.insert(name.into(), value.into());
                MessageContent::Translated { key, params }
            }
            text => text,
        }
    }

    /// Short human-readable preview (translation keys are shown verbatim).
    pub fn preview(&self) -> &str {
        match self {
            MessageContent::Text(s) => s,
            MessageContent::Translated { key, .. } => key,
        }
    }
}

/// Type-specific attachment carried by location/document/image messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessagePayload {
    Location {
        latitude: f64,
        longitude: f64,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
    },
    Document {
        name: String,
        /// Size in bytes.
        size: u64,
    },
    Image {
        url: String,
    },
}

impl MessagePayload {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessagePayload::Location { .. } => MessageKind::Location,
            MessagePayload::Document { .. } => MessageKind::Document,
            MessagePayload::Image { .. } => MessageKind::Image,
        }
    }
}

/// A chat message as held by the conversation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: SenderId,
    pub sender_name: String,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Only set for messages authored by the current user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePayload>,
}

impl Message {
    /// A message composed by the local user, starting its lifecycle at `Sent`.
    pub fn outgoing(sender_name: impl Into<String>, content: MessageContent) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id: SenderId::CurrentUser,
            sender_name: sender_name.into(),
            content,
            timestamp: Utc::now(),
            kind: MessageKind::Text,
            status: Some(MessageStatus::Sent),
            payload: None,
        }
    }

    /// An application-generated message. System messages carry no status.
    pub fn system(content: MessageContent) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id: SenderId::System,
            sender_name: "System".to_string(),
            content,
            timestamp: Utc::now(),
            kind: MessageKind::System,
            status: None,
            payload: None,
        }
    }

    /// Attach a typed payload; the message kind follows the payload.
    pub fn with_payload(mut self, payload: MessagePayload) -> Self {
        self.kind = payload.kind();
        self.payload = Some(payload);
        self
    }

    /// Whether the message takes part in the sent/delivered/read lifecycle.
    pub fn tracks_status(&self) -> bool {
        self.sender_id.is_current_user() && self.kind != MessageKind::System
    }

    /// Merge `patch` into this message, overwriting only provided fields.
    ///
    /// A status that would move backwards is dropped; the rest of the patch
    /// still applies. Returns `true` if anything changed.
    pub fn apply_patch(&mut self, patch: &MessagePatch) -> bool {
        let mut changed = false;

        if let Some(ref name) = patch.sender_name {
            if *name != self.sender_name {
                self.sender_name = name.clone();
                changed = true;
            }
        }
        if let Some(ref content) = patch.content {
            if *content != self.content {
                self.content = content.clone();
                changed = true;
            }
        }
        if let Some(ts) = patch.timestamp {
            if ts != self.timestamp {
                self.timestamp = ts;
                changed = true;
            }
        }
        if let Some(kind) = patch.kind {
            if kind != self.kind {
                self.kind = kind;
                changed = true;
            }
        }
        if let Some(next) = patch.status {
            let advances = match self.status {
                Some(current) => current.can_advance_to(next) && current != next,
                None => true,
            };
            if advances {
                self.status = Some(next);
                changed = true;
            }
        }
        if let Some(ref payload) = patch.payload {
            if self.payload.as_ref() != Some(payload) {
                self.payload = Some(payload.clone());
                changed = true;
            }
        }

        changed
    }
}

/// Partial update of a [`Message`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePayload>,
}

impl MessagePatch {
    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// An ordered message log. Insertion order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, messages: Vec<Message>) -> Self {
        Self {
            id,
            messages,
            updated_at: Utc::now(),
        }
    }

    pub fn find_mut(&mut self, message_id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == message_id)
    }
}

// ---------------------------------------------------------------------------
// Chat records returned by the backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_by: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConversation {
    pub id: ConversationId,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<RemoteMessage>,
    #[serde(default)]
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
}

impl RemoteConversation {
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| &p.user_id == user_id)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Client-side notification payload; the server assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub sound_enabled: bool,
    pub push_enabled: bool,
    /// Server-defined keys the client does not interpret but must keep.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            push_enabled: false,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilters {
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
}

impl NotificationFilters {
    pub fn matches(&self, n: &Notification) -> bool {
        self.kind.map_or(true, |k| n.kind == k)
            && self.category.as_ref().map_or(true, |c| &n.category == c)
            && self.read.map_or(true, |r| n.read == r)
            && self.start_date.map_or(true, |start| n.created_at >= start)
            && self.end_date.map_or(true, |end| n.created_at <= end)
    }
}

/// 1-based page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    /// Unread total across every page, as counted by the server.
    pub unread_count: u32,
    pub page: u32,
    pub page_size: u32,
    pub total: u32,
    pub total_pages: u32,
}
