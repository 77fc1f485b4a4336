//! Notification state store.
//!
//! Remote-backed operations follow the policy returned by
//! [`NotificationOp::policy`]:
//!
//! - **Pessimistic**: call the service first, touch local state only after
//!   it succeeds.
//! - **Optimistic**: flip local state first, send the change, revert if the
//!   service rejects it.
//! - **Local**: no remote call at all.
//!
//! Every remote-backed operation clears `error` and raises `loading` before
//! the call; a drop guard lowers `loading` on every exit path. Failures are
//! recorded in `error` and also returned to the caller.
//!
//! `unread_count` is always recomputed from the local list, never adjusted
//! incrementally.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use tourdesk_shared::constants::NOTIFICATIONS_STORAGE_KEY;
use tourdesk_shared::models::{
    Notification, NotificationDraft, NotificationFilters, NotificationPreferences, Pagination,
};
use tourdesk_shared::protocol::{
    CreateNotificationRequest, NotificationQuery, PushSubscription, TemplateNotificationRequest,
};
use tourdesk_shared::types::{NotificationId, UserId};
use tourdesk_store::{load_state, save_state, KeyValueStorage};

use crate::error::{ClientError, Result};
use crate::platform::{Permission, PlatformNotifier};
use crate::services::NotificationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPolicy {
    Optimistic,
    Pessimistic,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOp {
    Fetch,
    Add,
    CreateFromTemplate,
    MarkAsRead,
    MarkAllAsRead,
    Remove,
    ClearAll,
    ToggleSound,
    TogglePush,
    FetchPreferences,
    SetVisibility,
    SetFilters,
}

impl NotificationOp {
    pub const fn policy(self) -> MutationPolicy {
        match self {
            NotificationOp::ToggleSound | NotificationOp::TogglePush => MutationPolicy::Optimistic,
            NotificationOp::SetVisibility | NotificationOp::SetFilters => MutationPolicy::Local,
            NotificationOp::Fetch
            | NotificationOp::Add
            | NotificationOp::CreateFromTemplate
            | NotificationOp::MarkAsRead
            | NotificationOp::MarkAllAsRead
            | NotificationOp::Remove
            | NotificationOp::ClearAll
            | NotificationOp::FetchPreferences => MutationPolicy::Pessimistic,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            NotificationOp::Fetch => "fetch_notifications",
            NotificationOp::Add => "add_notification",
            NotificationOp::CreateFromTemplate => "create_from_template",
            NotificationOp::MarkAsRead => "mark_as_read",
            NotificationOp::MarkAllAsRead => "mark_all_as_read",
            NotificationOp::Remove => "remove_notification",
            NotificationOp::ClearAll => "clear_all",
            NotificationOp::ToggleSound => "toggle_sound",
            NotificationOp::TogglePush => "toggle_push",
            NotificationOp::FetchPreferences => "fetch_preferences",
            NotificationOp::SetVisibility => "set_visibility",
            NotificationOp::SetFilters => "set_filters",
        }
    }
}

/// Result of [`NotificationStore::fetch_notifications`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch had already been applied; this response was dropped.
    Stale,
}

/// Read-only copy of the store state handed to views.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub is_visible: bool,
    pub sound_enabled: bool,
    pub push_enabled: bool,
    pub error: Option<String>,
    pub loading: bool,
    pub filters: NotificationFilters,
    pub pagination: Pagination,
    pub total: u32,
    pub total_pages: u32,
    /// Unread count across all pages as last reported by the server.
    pub server_unread: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSettings {
    filters: NotificationFilters,
    pagination: Pagination,
    sound_enabled: bool,
    push_enabled: bool,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        let prefs = NotificationPreferences::default();
        Self {
            filters: NotificationFilters::default(),
            pagination: Pagination::default(),
            sound_enabled: prefs.sound_enabled,
            push_enabled: prefs.push_enabled,
        }
    }
}

#[derive(Debug, Default)]
struct NotificationState {
    notifications: Vec<Notification>,
    unread_count: usize,
    is_visible: bool,
    sound_enabled: bool,
    push_enabled: bool,
    preference_extras: serde_json::Map<String, serde_json::Value>,
    error: Option<String>,
    in_flight: usize,
    filters: NotificationFilters,
    pagination: Pagination,
    total: u32,
    total_pages: u32,
    server_unread: u32,
    applied_fetch: u64,
}

impl NotificationState {
    fn recount(&mut self) {
        self.unread_count = self.notifications.iter().filter(|n| !n.read).count();
    }

    fn preferences(&self) -> NotificationPreferences {
        NotificationPreferences {
            sound_enabled: self.sound_enabled,
            push_enabled: self.push_enabled,
            extra: self.preference_extras.clone(),
        }
    }

    fn settings(&self) -> PersistedSettings {
        PersistedSettings {
            filters: self.filters.clone(),
            pagination: self.pagination,
            sound_enabled: self.sound_enabled,
            push_enabled: self.push_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PreferenceFlag {
    Sound,
    Push,
}

impl PreferenceFlag {
    fn get(self, state: &NotificationState) -> bool {
        match self {
            PreferenceFlag::Sound => state.sound_enabled,
            PreferenceFlag::Push => state.push_enabled,
        }
    }

    fn set(self, state: &mut NotificationState, value: bool) {
        match self {
            PreferenceFlag::Sound => state.sound_enabled = value,
            PreferenceFlag::Push => state.push_enabled = value,
        }
    }
}

pub struct NotificationStore {
    service: Arc<dyn NotificationService>,
    platform: Arc<dyn PlatformNotifier>,
    storage: Arc<dyn KeyValueStorage>,
    state: Mutex<NotificationState>,
    fetch_seq: AtomicU64,
    restored: bool,
}

/// Lowers the loading flag when the operation that raised it ends.
struct LoadingGuard<'a> {
    store: &'a NotificationStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

impl NotificationStore {
    /// Build the store, rehydrating filters, pagination and the sound/push
    /// flags. The notification list always starts empty.
    pub fn new(
        service: Arc<dyn NotificationService>,
        platform: Arc<dyn PlatformNotifier>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let (settings, restored) =
            match load_state::<PersistedSettings>(storage.as_ref(), NOTIFICATIONS_STORAGE_KEY) {
                Ok(Some(settings)) => (settings, true),
                Ok(None) => (PersistedSettings::default(), false),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable notification settings");
                    (PersistedSettings::default(), false)
                }
            };

        let state = NotificationState {
            sound_enabled: settings.sound_enabled,
            push_enabled: settings.push_enabled,
            filters: settings.filters,
            pagination: settings.pagination,
            ..NotificationState::default()
        };

        Self {
            service,
            platform,
            storage,
            state: Mutex::new(state),
            fetch_seq: AtomicU64::new(0),
            restored,
        }
    }

    /// Whether settings were rehydrated from storage at construction.
    pub fn restored_settings(&self) -> bool {
        self.restored
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        let s = self.lock();
        NotificationSnapshot {
            notifications: s.notifications.clone(),
            unread_count: s.unread_count,
            is_visible: s.is_visible,
            sound_enabled: s.sound_enabled,
            push_enabled: s.push_enabled,
            error: s.error.clone(),
            loading: s.in_flight > 0,
            filters: s.filters.clone(),
            pagination: s.pagination,
            total: s.total,
            total_pages: s.total_pages,
            server_unread: s.server_unread,
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().unread_count
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.lock().is_visible
    }

    // -- Pessimistic operations ---------------------------------------------

    /// Replace the list with the page selected by the current filters and
    /// pagination.
    ///
    /// Responses are applied in request order: a response whose request was
    /// issued before an already-applied one is dropped.
    pub async fn fetch_notifications(&self, user_id: &UserId) -> Result<FetchOutcome> {
        let op = NotificationOp::Fetch;
        let _loading = self.begin(op);
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let s = self.lock();
            NotificationQuery::new(&s.filters, s.pagination)
        };

        let page = match self.service.get_notifications(user_id, &query).await {
            Ok(page) => page,
            Err(e) => {
                let superseded = self.lock().applied_fetch > seq;
                if superseded {
                    debug!(seq, error = %e, "Ignoring failure of superseded fetch");
                    return Err(e);
                }
                return Err(self.fail(op, e));
            }
        };

        let mut s = self.lock();
        if s.applied_fetch > seq {
            debug!(seq, applied = s.applied_fetch, "Dropping stale notification page");
            return Ok(FetchOutcome::Stale);
        }

        s.applied_fetch = seq;
        s.notifications = page.notifications;
        s.recount();
        s.pagination = Pagination {
            page: page.page,
            page_size: page.page_size,
        };
        s.total = page.total;
        s.total_pages = page.total_pages;
        s.server_unread = page.unread_count;
        debug!(
            user = %user_id,
            count = s.notifications.len(),
            unread = s.unread_count,
            page = page.page,
            "Notifications fetched"
        );
        Ok(FetchOutcome::Applied)
    }

    /// Create a notification on the server and prepend the stored record.
    pub async fn add_notification(
        &self,
        user_id: &UserId,
        draft: NotificationDraft,
    ) -> Result<Notification> {
        let op = NotificationOp::Add;
        let _loading = self.begin(op);
        let request = CreateNotificationRequest {
            user_id: user_id.clone(),
            draft,
        };
        let created = self
            .service
            .create_notification(request)
            .await
            .map_err(|e| self.fail(op, e))?;

        self.prepend(&created);
        Ok(created)
    }

    /// Instantiate a server-side template and prepend the result.
    pub async fn create_from_template(
        &self,
        user_id: &UserId,
        template_id: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Notification> {
        let op = NotificationOp::CreateFromTemplate;
        let _loading = self.begin(op);
        let request = TemplateNotificationRequest {
            user_id: user_id.clone(),
            params,
        };
        let created = self
            .service
            .create_from_template(template_id, request)
            .await
            .map_err(|e| self.fail(op, e))?;

        self.prepend(&created);
        Ok(created)
    }

    pub async fn mark_as_read(&self, id: &NotificationId) -> Result<()> {
        let op = NotificationOp::MarkAsRead;
        let _loading = self.begin(op);
        let updated = self
            .service
            .mark_as_read(id)
            .await
            .map_err(|e| self.fail(op, e))?;

        let mut s = self.lock();
        if let Some(slot) = s.notifications.iter_mut().find(|n| &n.id == id) {
            *slot = updated;
        }
        s.recount();
        debug!(id = %id, unread = s.unread_count, "Notification marked read");
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user_id: &UserId) -> Result<()> {
        let op = NotificationOp::MarkAllAsRead;
        let _loading = self.begin(op);
        self.service
            .mark_all_as_read(user_id)
            .await
            .map_err(|e| self.fail(op, e))?;

        let mut s = self.lock();
        for n in s.notifications.iter_mut() {
            n.read = true;
        }
        s.recount();
        s.server_unread = 0;
        info!(user = %user_id, "All notifications marked read");
        Ok(())
    }

    pub async fn remove_notification(&self, id: &NotificationId) -> Result<()> {
        let op = NotificationOp::Remove;
        let _loading = self.begin(op);
        self.service
            .delete_notification(id)
            .await
            .map_err(|e| self.fail(op, e))?;

        let mut s = self.lock();
        s.notifications.retain(|n| &n.id != id);
        s.recount();
        debug!(id = %id, "Notification removed");
        Ok(())
    }

    pub async fn clear_all(&self, user_id: &UserId) -> Result<()> {
        let op = NotificationOp::ClearAll;
        let _loading = self.begin(op);
        self.service
            .clear_all(user_id)
            .await
            .map_err(|e| self.fail(op, e))?;

        let mut s = self.lock();
        s.notifications.clear();
        s.recount();
        s.total = 0;
        s.total_pages = 0;
        s.server_unread = 0;
        info!(user = %user_id, "Notifications cleared");
        Ok(())
    }

    /// Adopt the server's sound/push flags.
    pub async fn fetch_preferences(&self, user_id: &UserId) -> Result<NotificationPreferences> {
        let op = NotificationOp::FetchPreferences;
        let _loading = self.begin(op);
        let prefs = self
            .service
            .get_user_preferences(user_id)
            .await
            .map_err(|e| self.fail(op, e))?;

        {
            let mut s = self.lock();
            s.sound_enabled = prefs.sound_enabled;
            s.push_enabled = prefs.push_enabled;
            s.preference_extras = prefs.extra.clone();
            self.persist(&s);
        }
        debug!(
            user = %user_id,
            sound = prefs.sound_enabled,
            push = prefs.push_enabled,
            "Notification preferences loaded"
        );
        Ok(prefs)
    }

    // -- Optimistic operations ----------------------------------------------

    /// Flip the sound cue preference. Returns the new value.
    pub async fn toggle_sound(&self, user_id: &UserId) -> Result<bool> {
        self.toggle_preference(NotificationOp::ToggleSound, PreferenceFlag::Sound, user_id)
            .await
    }

    /// Flip the push preference. Returns the new value.
    ///
    /// Enabling asks the platform for permission first; a denial leaves push
    /// off and is not an error.
    pub async fn toggle_push(&self, user_id: &UserId) -> Result<bool> {
        let enabling = !self.lock().push_enabled;
        if enabling && self.platform.request_permission().await == Permission::Denied {
            info!(user = %user_id, "Push permission denied; push stays off");
            return Ok(false);
        }

        let enabled = self
            .toggle_preference(NotificationOp::TogglePush, PreferenceFlag::Push, user_id)
            .await?;
        self.sync_push_subscription(user_id, enabled).await;
        Ok(enabled)
    }

    async fn toggle_preference(
        &self,
        op: NotificationOp,
        flag: PreferenceFlag,
        user_id: &UserId,
    ) -> Result<bool> {
        debug_assert_eq!(op.policy(), MutationPolicy::Optimistic);
        let _loading = self.begin(op);

        let (previous, prefs) = {
            let mut s = self.lock();
            let previous = flag.get(&s);
            flag.set(&mut s, !previous);
            self.persist(&s);
            (previous, s.preferences())
        };

        match self.service.update_user_preferences(user_id, &prefs).await {
            Ok(saved) => {
                self.lock().preference_extras = saved.extra;
                info!(op = op.name(), enabled = !previous, "Notification preference updated");
                Ok(!previous)
            }
            Err(e) => {
                {
                    let mut s = self.lock();
                    flag.set(&mut s, previous);
                    self.persist(&s);
                }
                Err(self.fail(op, e))
            }
        }
    }

    async fn sync_push_subscription(&self, user_id: &UserId, enabled: bool) {
        let Some(endpoint) = self.platform.push_endpoint() else {
            debug!("Platform has no push endpoint; skipping subscription");
            return;
        };
        let subscription = PushSubscription {
            user_id: user_id.clone(),
            endpoint,
        };
        let result = if enabled {
            self.service.subscribe_push(&subscription).await
        } else {
            self.service.unsubscribe_push(&subscription).await
        };
        if let Err(e) = result {
            warn!(error = %e, enabled, "Push subscription sync failed");
        }
    }

    // -- Local operations ---------------------------------------------------

    pub fn set_visibility(&self, visible: bool) {
        self.lock().is_visible = visible;
    }

    /// Returns the new visibility.
    pub fn toggle_visibility(&self) -> bool {
        let mut s = self.lock();
        s.is_visible = !s.is_visible;
        s.is_visible
    }

    /// Replace the filters used by the next fetch and go back to page 1.
    pub fn set_filters(&self, filters: NotificationFilters) {
        let mut s = self.lock();
        s.filters = filters;
        s.pagination.page = 1;
        self.persist(&s);
    }

    pub fn set_page(&self, page: u32) {
        let mut s = self.lock();
        s.pagination.page = page.max(1);
        self.persist(&s);
    }

    pub fn set_page_size(&self, page_size: u32) {
        let mut s = self.lock();
        s.pagination.page_size = page_size.max(1);
        self.persist(&s);
    }

    // -- Internals ----------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, NotificationState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, op: NotificationOp) -> LoadingGuard<'_> {
        debug_assert_ne!(op.policy(), MutationPolicy::Local);
        let mut s = self.lock();
        s.in_flight += 1;
        s.error = None;
        LoadingGuard { store: self }
    }

    fn fail(&self, op: NotificationOp, e: ClientError) -> ClientError {
        error!(op = op.name(), error = %e, "Notification operation failed");
        self.lock().error = Some(e.to_string());
        e
    }

    fn prepend(&self, created: &Notification) {
        let (sound, push) = {
            let mut s = self.lock();
            s.notifications.insert(0, created.clone());
            s.recount();
            s.total = s.total.saturating_add(1);
            if !created.read {
                s.server_unread = s.server_unread.saturating_add(1);
            }
            (s.sound_enabled, s.push_enabled)
        };
        info!(id = %created.id, kind = created.kind.as_str(), "Notification added");

        if sound && !created.kind.is_neutral() {
            if let Err(e) = self.platform.play_sound(created.kind) {
                warn!(error = %e, "Notification sound failed");
            }
        }
        if push {
            if let Err(e) = self.platform.show_push(created) {
                warn!(error = %e, "Push display failed");
            }
        }
    }

    fn persist(&self, state: &NotificationState) {
        if let Err(e) = save_state(
            self.storage.as_ref(),
            NOTIFICATIONS_STORAGE_KEY,
            &state.settings(),
        ) {
            warn!(error = %e, "Failed to persist notification settings");
        }
    }
}
