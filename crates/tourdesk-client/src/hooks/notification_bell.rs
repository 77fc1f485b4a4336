//! Notification bell and its drop-down center.

use std::sync::Arc;

use tracing::warn;

use tourdesk_shared::models::Notification;
use tourdesk_shared::types::{NotificationId, UserId};

use crate::error::Result;
use crate::stores::NotificationStore;

/// Badge text for `unread` notifications: empty at zero, capped at `9+`.
pub fn badge_label(unread: usize) -> String {
    match unread {
        0 => String::new(),
        1..=9 => unread.to_string(),
        _ => "9+".to_string(),
    }
}

/// User-facing toast raised when a bell action fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub action: &'static str,
    pub message: String,
}

pub struct NotificationBell {
    store: Arc<NotificationStore>,
    user_id: UserId,
    feedback: Option<Feedback>,
}

impl NotificationBell {
    pub fn new(store: Arc<NotificationStore>, user_id: UserId) -> Self {
        Self {
            store,
            user_id,
            feedback: None,
        }
    }

    pub fn badge(&self) -> String {
        badge_label(self.store.unread_count())
    }

    pub fn is_open(&self) -> bool {
        self.store.is_visible()
    }

    /// Open or close the center. Opening refreshes the list.
    ///
    /// Returns whether the center is open afterwards.
    pub async fn toggle(&mut self) -> bool {
        let open = self.store.toggle_visibility();
        if open {
            let result = self.store.fetch_notifications(&self.user_id).await.map(|_| ());
            self.report("refresh", result);
        }
        open
    }

    pub async fn mark_read(&mut self, id: &NotificationId) {
        let result = self.store.mark_as_read(id).await;
        self.report("mark_read", result);
    }

    pub async fn dismiss(&mut self, id: &NotificationId) {
        let result = self.store.remove_notification(id).await;
        self.report("dismiss", result);
    }

    pub async fn mark_all_read(&mut self) {
        let result = self.store.mark_all_as_read(&self.user_id).await;
        self.report("mark_all_read", result);
    }

    pub async fn clear_all(&mut self) {
        let result = self.store.clear_all(&self.user_id).await;
        self.report("clear_all", result);
    }

    /// The newest `n` notifications.
    pub fn recent(&self, n: usize) -> Vec<Notification> {
        let mut list = self.store.notifications();
        list.truncate(n);
        list
    }

    pub fn take_feedback(&mut self) -> Option<Feedback> {
        self.feedback.take()
    }

    fn report(&mut self, action: &'static str, result: Result<()>) {
        if let Err(e) = result {
            warn!(action, error = %e, "Notification action failed");
            self.feedback = Some(Feedback {
                action,
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Permission;
    use crate::testing::{notification, MockNotificationService, RecordingNotifier};
    use tourdesk_shared::types::NotificationKind;
    use tourdesk_store::MemoryStorage;

    fn setup(seed: Vec<Notification>) -> (NotificationBell, Arc<MockNotificationService>) {
        let service = Arc::new(MockNotificationService::with_notifications(seed));
        let store = NotificationStore::new(
            service.clone(),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
            Arc::new(MemoryStorage::new()),
        );
        (NotificationBell::new(Arc::new(store), "u1".into()), service)
    }

    fn unread(n: usize) -> Vec<Notification> {
        (0..n)
            .map(|i| notification(&format!("n{i}"), "u1", NotificationKind::Info, false))
            .collect()
    }

    #[test]
    fn badge_labels() {
        assert_eq!(badge_label(0), "");
        assert_eq!(badge_label(1), "1");
        assert_eq!(badge_label(9), "9");
        assert_eq!(badge_label(10), "9+");
        assert_eq!(badge_label(250), "9+");
    }

    #[tokio::test]
    async fn opening_refreshes_and_closing_does_not() {
        let (mut bell, service) = setup(unread(12));
        assert_eq!(bell.badge(), "");

        assert!(bell.toggle().await);
        assert_eq!(bell.badge(), "9+");
        assert_eq!(bell.recent(5).len(), 5);

        service.notifications.lock().unwrap().clear();
        assert!(!bell.toggle().await);
        assert_eq!(bell.badge(), "9+");
        assert!(!bell.is_open());
    }

    #[tokio::test]
    async fn failures_become_feedback() {
        let (mut bell, service) = setup(unread(2));
        bell.toggle().await;
        service.fail("delete_notification");

        bell.dismiss(&"n0".into()).await;

        let feedback = bell.take_feedback().unwrap();
        assert_eq!(feedback.action, "dismiss");
        assert_eq!(bell.recent(10).len(), 2);
        assert!(bell.take_feedback().is_none());
    }

    #[tokio::test]
    async fn bulk_actions_update_badge() {
        let (mut bell, _) = setup(unread(3));
        bell.toggle().await;

        bell.mark_read(&"n1".into()).await;
        assert_eq!(bell.badge(), "2");

        bell.mark_all_read().await;
        assert_eq!(bell.badge(), "");

        bell.clear_all().await;
        assert!(bell.recent(10).is_empty());
        assert!(bell.take_feedback().is_none());
    }
}
