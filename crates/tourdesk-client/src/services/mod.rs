//! REST service clients.
//!
//! Each service is a trait so stores and hooks can be driven by an
//! in-process double in tests; the `Http*` implementations talk to the real
//! backend through a shared [`RestClient`].

pub mod chat;
pub mod notifications;
pub mod rest;

pub use chat::{ChatService, HttpChatService};
pub use notifications::{HttpNotificationService, NotificationService};
pub use rest::RestClient;
