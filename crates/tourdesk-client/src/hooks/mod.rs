//! View models consumed by the UI layer.
//!
//! Hooks own transient view state and orchestrate side effects; the
//! durable state lives in the stores.

pub mod chat_list;
pub mod chat_window;
pub mod notification_bell;

pub use chat_list::{ChatList, ChatSummary};
pub use chat_window::{ChatOrigin, ChatWindow, ScrollBehavior};
pub use notification_bell::{badge_label, Feedback, NotificationBell};
