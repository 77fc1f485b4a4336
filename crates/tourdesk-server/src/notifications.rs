//! In-memory notification repository.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tracing::{debug, info};

use tourdesk_shared::models::{
    Notification, NotificationDraft, NotificationFilters, NotificationPage, NotificationPreferences,
};
use tourdesk_shared::protocol::PushSubscription;
use tourdesk_shared::types::{NotificationId, UserId};

use crate::error::{Result, ServerError};
use crate::templates;

#[derive(Debug, Default)]
pub struct NotificationRepo {
    /// Newest first.
    notifications: Vec<Notification>,
    preferences: HashMap<UserId, NotificationPreferences>,
    subscriptions: Vec<PushSubscription>,
}

impl NotificationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(
        &self,
        user_id: &UserId,
        filters: &NotificationFilters,
        page: u32,
        page_size: u32,
    ) -> NotificationPage {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let matching: Vec<&Notification> = self
            .notifications
            .iter()
            .filter(|n| &n.user_id == user_id && filters.matches(n))
            .collect();

        let total = matching.len() as u32;
        let unread_count = matching.iter().filter(|n| !n.read).count() as u32;
        let notifications = matching
            .into_iter()
            .skip(((page - 1) * page_size) as usize)
            .take(page_size as usize)
            .cloned()
            .collect();

        NotificationPage {
            notifications,
            unread_count,
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        }
    }

    pub fn create(&mut self, user_id: UserId, draft: NotificationDraft) -> Notification {
        let notification = Notification {
            id: NotificationId::new(uuid::Uuid::new_v4().to_string()),
            user_id,
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            category: draft.category,
            action_url: draft.action_url,
            read: false,
            created_at: Utc::now(),
        };
        info!(
            id = %notification.id,
            user = %notification.user_id,
            kind = notification.kind.as_str(),
            "Notification created"
        );
        self.notifications.insert(0, notification.clone());
        notification
    }

    pub fn create_from_template(
        &mut self,
        template_id: &str,
        user_id: UserId,
        params: &BTreeMap<String, String>,
    ) -> Result<Notification> {
        let template = templates::find(template_id)
            .ok_or_else(|| ServerError::TemplateNotFound(template_id.to_string()))?;
        let draft = template.instantiate(params)?;
        Ok(self.create(user_id, draft))
    }

    pub fn mark_read(&mut self, id: &NotificationId) -> Result<Notification> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| ServerError::NotificationNotFound(id.to_string()))?;
        notification.read = true;
        Ok(notification.clone())
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&mut self, user_id: &UserId) -> usize {
        let mut changed = 0;
        for n in self
            .notifications
            .iter_mut()
            .filter(|n| &n.user_id == user_id && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        debug!(user = %user_id, changed, "Notifications marked read");
        changed
    }

    pub fn delete(&mut self, id: &NotificationId) -> Result<()> {
        let before = self.notifications.len();
        self.notifications.retain(|n| &n.id != id);
        if self.notifications.len() == before {
            return Err(ServerError::NotificationNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Returns how many notifications were removed.
    pub fn clear_all(&mut self, user_id: &UserId) -> usize {
        let before = self.notifications.len();
        self.notifications.retain(|n| &n.user_id != user_id);
        before - self.notifications.len()
    }

    pub fn preferences(&self, user_id: &UserId) -> NotificationPreferences {
        self.preferences.get(user_id).cloned().unwrap_or_default()
    }

    /// Store `update`, keeping extra keys the update does not mention.
    pub fn update_preferences(
        &mut self,
        user_id: &UserId,
        update: NotificationPreferences,
    ) -> NotificationPreferences {
        let entry = self.preferences.entry(user_id.clone()).or_default();
        entry.sound_enabled = update.sound_enabled;
        entry.push_enabled = update.push_enabled;
        entry.extra.extend(update.extra);
        debug!(
            user = %user_id,
            sound = entry.sound_enabled,
            push = entry.push_enabled,
            "Preferences updated"
        );
        entry.clone()
    }

    /// Returns `false` if the subscription already existed.
    pub fn subscribe(&mut self, subscription: PushSubscription) -> bool {
        if self.subscriptions.contains(&subscription) {
            return false;
        }
        info!(user = %subscription.user_id, "Push subscription added");
        self.subscriptions.push(subscription);
        true
    }

    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&mut self, subscription: &PushSubscription) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s != subscription);
        before != self.subscriptions.len()
    }

    pub fn subscription_count(&self, user_id: &UserId) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| &s.user_id == user_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourdesk_shared::types::NotificationKind;

    fn draft(kind: NotificationKind, category: &str) -> NotificationDraft {
        NotificationDraft {
            kind,
            title: "t".into(),
            message: "m".into(),
            category: category.into(),
            action_url: None,
        }
    }

    fn seeded() -> NotificationRepo {
        let mut repo = NotificationRepo::new();
        for i in 0..5 {
            let kind = if i % 2 == 0 { NotificationKind::Info } else { NotificationKind::Error };
            repo.create("u1".into(), draft(kind, "booking"));
        }
        repo.create("u2".into(), draft(NotificationKind::Info, "booking"));
        repo
    }

    #[test]
    fn lists_newest_first_with_pagination() {
        let repo = seeded();
        let page = repo.list(&"u1".into(), &NotificationFilters::default(), 2, 2);

        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.notifications.len(), 2);
        assert_eq!(page.unread_count, 5);
        assert!(page.notifications[0].created_at >= page.notifications[1].created_at);
    }

    #[test]
    fn filters_apply_before_paging() {
        let mut repo = seeded();
        let errors = NotificationFilters {
            kind: Some(NotificationKind::Error),
            ..NotificationFilters::default()
        };
        assert_eq!(repo.list(&"u1".into(), &errors, 1, 20).total, 2);

        let first = repo.list(&"u1".into(), &NotificationFilters::default(), 1, 1).notifications[0]
            .id
            .clone();
        repo.mark_read(&first).unwrap();
        let unread_only = NotificationFilters {
            read: Some(false),
            ..NotificationFilters::default()
        };
        assert_eq!(repo.list(&"u1".into(), &unread_only, 1, 20).total, 4);
    }

    #[test]
    fn bulk_operations_are_per_user() {
        let mut repo = seeded();
        assert_eq!(repo.mark_all_read(&"u1".into()), 5);
        assert_eq!(repo.list(&"u2".into(), &NotificationFilters::default(), 1, 20).unread_count, 1);

        assert_eq!(repo.clear_all(&"u1".into()), 5);
        assert_eq!(repo.list(&"u2".into(), &NotificationFilters::default(), 1, 20).total, 1);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut repo = seeded();
        assert!(matches!(
            repo.mark_read(&"ghost".into()),
            Err(ServerError::NotificationNotFound(_))
        ));
        assert!(repo.delete(&"ghost".into()).is_err());
    }

    #[test]
    fn templates_render_or_fail() {
        let mut repo = NotificationRepo::new();
        let params = BTreeMap::from([("invoice".to_string(), "INV-9".to_string())]);

        let n = repo
            .create_from_template("payment-failed", "u1".into(), &params)
            .unwrap();
        assert!(n.message.contains("INV-9"));
        assert_eq!(n.kind, NotificationKind::Error);

        assert!(matches!(
            repo.create_from_template("nope", "u1".into(), &params),
            Err(ServerError::TemplateNotFound(_))
        ));
        assert!(matches!(
            repo.create_from_template("booking-confirmed", "u1".into(), &params),
            Err(ServerError::Model(_))
        ));
    }

    #[test]
    fn preference_updates_keep_extra_keys() {
        let mut repo = NotificationRepo::new();
        let u: UserId = "u1".into();
        let mut first = NotificationPreferences::default();
        first.extra.insert("digest".into(), serde_json::json!("daily"));
        repo.update_preferences(&u, first);

        let saved = repo.update_preferences(
            &u,
            NotificationPreferences {
                sound_enabled: false,
                push_enabled: true,
                extra: serde_json::Map::new(),
            },
        );

        assert!(!saved.sound_enabled);
        assert!(saved.push_enabled);
        assert_eq!(saved.extra.get("digest"), Some(&serde_json::json!("daily")));
        assert_eq!(repo.preferences(&"other".into()), NotificationPreferences::default());
    }

    #[test]
    fn subscriptions_are_idempotent() {
        let mut repo = NotificationRepo::new();
        let sub = PushSubscription {
            user_id: "u1".into(),
            endpoint: "https://push.example.test/1".into(),
        };
        assert!(repo.subscribe(sub.clone()));
        assert!(!repo.subscribe(sub.clone()));
        assert_eq!(repo.subscription_count(&"u1".into()), 1);
        assert!(repo.unsubscribe(&sub));
        assert!(!repo.unsubscribe(&sub));
    }
}
