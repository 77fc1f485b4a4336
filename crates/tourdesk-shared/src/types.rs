use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CURRENT_USER_SENDER, SYSTEM_SENDER};
use crate::error::ModelError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a conversation (chat thread).
    ConversationId
);
string_id!(
    /// Identifier of a message, unique within its conversation.
    MessageId
);
string_id!(NotificationId);
string_id!(UserId);

impl MessageId {
    /// Fresh locally-generated id for a message composed on this device.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Author of a message.
///
/// Two reserved wire values exist: one for the local user and one for
/// messages generated by the application itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SenderId {
    CurrentUser,
    System,
    User(UserId),
}

impl SenderId {
    pub fn is_current_user(&self) -> bool {
        matches!(self, SenderId::CurrentUser)
    }
}

impl From<String> for SenderId {
    fn from(s: String) -> Self {
        match s.as_str() {
            CURRENT_USER_SENDER => SenderId::CurrentUser,
            SYSTEM_SENDER => SenderId::System,
            _ => SenderId::User(UserId(s)),
        }
    }
}

impl From<SenderId> for String {
    fn from(sender: SenderId) -> Self {
        match sender {
            SenderId::CurrentUser => CURRENT_USER_SENDER.to_string(),
            SenderId::System => SYSTEM_SENDER.to_string(),
            SenderId::User(id) => id.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
    Location,
    Document,
    Image,
}

impl FromStr for MessageKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "system" => Ok(Self::System),
            "location" => Ok(Self::Location),
            "document" => Ok(Self::Document),
            "image" => Ok(Self::Image),
            other => Err(ModelError::UnknownMessageKind(other.to_string())),
        }
    }
}

/// Delivery status of a self-authored message.
///
/// Variants are declared in lifecycle order so that `Ord` matches the only
/// legal direction of travel: `Sent < Delivered < Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        next >= self
    }

    pub fn is_terminal(self) -> bool {
        self == MessageStatus::Read
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    /// The neutral kind does not trigger an audio cue.
    pub fn is_neutral(self) -> bool {
        self == NotificationKind::Info
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(ModelError::UnknownNotificationKind(other.to_string())),
        }
    }
}

/// Back-office roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Agency,
    Guide,
    Client,
}

/// Roles allowed to place voice/video calls from a chat.
pub const CALL_ALLOWED_ROLES: [UserRole; 3] = [UserRole::Admin, UserRole::Agency, UserRole::Guide];

impl UserRole {
    pub fn can_place_calls(self) -> bool {
        CALL_ALLOWED_ROLES.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Direct,
    Group,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_sender_values_map_to_variants() {
        assert_eq!(SenderId::from(CURRENT_USER_SENDER.to_string()), SenderId::CurrentUser);
        assert_eq!(SenderId::from(SYSTEM_SENDER.to_string()), SenderId::System);
        assert_eq!(
            SenderId::from("guide-7".to_string()),
            SenderId::User(UserId::from("guide-7"))
        );
    }

    #[test]
    fn sender_serializes_as_plain_string() {
        let json = serde_json::to_string(&SenderId::System).unwrap();
        assert_eq!(json, format!("\"{SYSTEM_SENDER}\""));
    }

    #[test]
    fn status_order_is_lifecycle_order() {
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Delivered));
        assert!(MessageStatus::Delivered.can_advance_to(MessageStatus::Read));
        assert!(MessageStatus::Read.can_advance_to(MessageStatus::Read));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Delivered.can_advance_to(MessageStatus::Sent));
    }

    #[test]
    fn call_allow_list() {
        assert!(UserRole::Agency.can_place_calls());
        assert!(UserRole::Guide.can_place_calls());
        assert!(!UserRole::Client.can_place_calls());
    }

    #[test]
    fn kinds_parse_from_query_values() {
        assert_eq!("warning".parse::<NotificationKind>().unwrap(), NotificationKind::Warning);
        assert!("loud".parse::<NotificationKind>().is_err());
        assert_eq!("image".parse::<MessageKind>().unwrap(), MessageKind::Image);
    }
}
