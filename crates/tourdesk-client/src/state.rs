//! Application state shared by every view.
//!
//! [`AppState`] wires the REST services, the persistent key-value storage
//! and the two stores together, and hands out the hooks the views use.

use std::sync::Arc;

use tracing::info;

use tourdesk_shared::types::{ConversationId, UserId, UserRole};
use tourdesk_store::{Database, KeyValueStorage, SqliteStorage};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::hooks::{ChatList, ChatOrigin, ChatWindow, NotificationBell};
use crate::platform::PlatformNotifier;
use crate::scheduler::StatusScheduler;
use crate::services::{
    ChatService, HttpChatService, HttpNotificationService, NotificationService, RestClient,
};
use crate::stores::{ConversationStore, NotificationStore};

/// The signed-in back-office user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub role: UserRole,
}

pub struct AppState {
    pub config: ClientConfig,
    pub session: SessionUser,
    pub conversations: Arc<ConversationStore>,
    pub notifications: Arc<NotificationStore>,
    pub scheduler: Arc<StatusScheduler>,
    pub chat_service: Arc<dyn ChatService>,
}

impl AppState {
    /// Open the local database and connect the HTTP services described by
    /// `config`.
    pub fn bootstrap(
        config: ClientConfig,
        session: SessionUser,
        platform: Arc<dyn PlatformNotifier>,
    ) -> Result<Self> {
        let db = match &config.data_dir {
            Some(dir) => Database::open_in_dir(dir)?,
            None => Database::new()?,
        };
        info!(path = ?db.path(), "Local storage opened");
        let storage: Arc<dyn KeyValueStorage> = Arc::new(SqliteStorage::new(db));

        let rest = Arc::new(RestClient::new(
            config.api_base_url.clone(),
            config.auth_token.clone(),
        ));
        let chat: Arc<dyn ChatService> = Arc::new(HttpChatService::new(rest.clone()));
        let notifications: Arc<dyn NotificationService> =
            Arc::new(HttpNotificationService::new(rest));

        Ok(Self::with_parts(
            config,
            session,
            storage,
            chat,
            notifications,
            platform,
        ))
    }

    /// Assemble the state from already-built parts.
    pub fn with_parts(
        config: ClientConfig,
        session: SessionUser,
        storage: Arc<dyn KeyValueStorage>,
        chat_service: Arc<dyn ChatService>,
        notification_service: Arc<dyn NotificationService>,
        platform: Arc<dyn PlatformNotifier>,
    ) -> Self {
        let conversations = Arc::new(ConversationStore::load(storage.clone()));
        let notifications = NotificationStore::new(notification_service, platform, storage);
        // The configured page size only seeds a first run.
        if !notifications.restored_settings() {
            notifications.set_page_size(config.page_size);
        }

        Self {
            config,
            session,
            conversations,
            notifications: Arc::new(notifications),
            scheduler: Arc::new(StatusScheduler::new()),
            chat_service,
        }
    }

    pub fn open_chat(&self, conversation_id: ConversationId, origin: ChatOrigin) -> ChatWindow {
        ChatWindow::open(
            self.conversations.clone(),
            self.scheduler.clone(),
            self.config.receipt_delays,
            self.session.clone(),
            conversation_id,
            origin,
        )
    }

    pub fn chat_list(&self) -> ChatList {
        ChatList::new(self.chat_service.clone(), self.session.id.clone())
    }

    pub fn notification_bell(&self) -> NotificationBell {
        NotificationBell::new(self.notifications.clone(), self.session.id.clone())
    }
}
