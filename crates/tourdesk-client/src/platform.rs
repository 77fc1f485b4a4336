//! Platform side channels: push notification display and audio cues.
//!
//! Both are best-effort. Callers log failures and never let them change the
//! outcome of the store mutation that triggered them.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use tourdesk_shared::models::Notification;
use tourdesk_shared::types::NotificationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Push notifications are not permitted")]
    NotPermitted,

    #[error("Audio playback failed: {0}")]
    Audio(String),

    #[error("Platform notification failed: {0}")]
    Display(String),
}

#[async_trait]
pub trait PlatformNotifier: Send + Sync {
    /// Ask the platform for push permission (may prompt the user).
    async fn request_permission(&self) -> Permission;

    fn show_push(&self, notification: &Notification) -> Result<(), PlatformError>;

    fn play_sound(&self, kind: NotificationKind) -> Result<(), PlatformError>;

    /// Endpoint the backend should deliver pushes to, if the platform has one.
    fn push_endpoint(&self) -> Option<String> {
        None
    }
}

/// Headless notifier that reports through `tracing`.
///
/// Used by the CLI and anywhere no desktop notification system exists.
pub struct TracingNotifier {
    permitted: AtomicBool,
}

impl TracingNotifier {
    pub fn new(permitted: bool) -> Self {
        Self {
            permitted: AtomicBool::new(permitted),
        }
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl PlatformNotifier for TracingNotifier {
    async fn request_permission(&self) -> Permission {
        if self.permitted.load(Ordering::Relaxed) {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn show_push(&self, notification: &Notification) -> Result<(), PlatformError> {
        if !self.permitted.load(Ordering::Relaxed) {
            return Err(PlatformError::NotPermitted);
        }
        info!(
            id = %notification.id,
            kind = notification.kind.as_str(),
            title = %notification.title,
            "Push notification"
        );
        Ok(())
    }

    fn play_sound(&self, kind: NotificationKind) -> Result<(), PlatformError> {
        info!(kind = kind.as_str(), "Notification sound");
        Ok(())
    }
}
