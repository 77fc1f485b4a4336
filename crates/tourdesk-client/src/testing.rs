//! In-process doubles for the REST services and the platform notifier.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::oneshot;

use tourdesk_shared::models::{
    Notification, NotificationPage, NotificationPreferences, Participant, RemoteConversation,
    RemoteMessage, UserProfile,
};
use tourdesk_shared::protocol::{
    CreateConversationRequest, CreateNotificationRequest, MessagesQuery, NotificationQuery,
    PushSubscription, SendMessageRequest, TemplateNotificationRequest,
};
use tourdesk_shared::types::{
    ConversationId, ConversationType, MessageId, MessageKind, NotificationId, NotificationKind,
    UserId, UserRole,
};

use crate::error::{ClientError, Result};
use crate::platform::{Permission, PlatformError, PlatformNotifier};
use crate::services::{ChatService, NotificationService};

fn mock_failure(op: &str) -> ClientError {
    ClientError::Status {
        status: 500,
        message: format!("mock failure in {op}"),
    }
}

pub fn notification(id: &str, user: &str, kind: NotificationKind, read: bool) -> Notification {
    Notification {
        id: NotificationId::from(id),
        user_id: UserId::from(user),
        kind,
        title: format!("Title {id}"),
        message: format!("Body {id}"),
        category: "booking".into(),
        action_url: None,
        read,
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockNotificationService {
    pub notifications: Mutex<Vec<Notification>>,
    pub preferences: Mutex<NotificationPreferences>,
    pub subscriptions: Mutex<Vec<PushSubscription>>,
    failing: Mutex<HashSet<&'static str>>,
    /// Pre-computed fetch responses, each optionally held until its gate opens.
    scripted_pages: Mutex<VecDeque<(NotificationPage, Option<oneshot::Receiver<()>>)>>,
    next_id: Mutex<u32>,
}

impl MockNotificationService {
    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        let svc = Self::default();
        *svc.notifications.lock().unwrap() = notifications;
        svc
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn script_page(&self, page: NotificationPage, gate: Option<oneshot::Receiver<()>>) {
        self.scripted_pages.lock().unwrap().push_back((page, gate));
    }

    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing.lock().unwrap().contains(op) {
            Err(mock_failure(op))
        } else {
            Ok(())
        }
    }

    fn fresh_id(&self) -> NotificationId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        NotificationId::new(format!("srv-{}", *next))
    }

    fn store(&self, user_id: UserId, kind: NotificationKind, title: String, message: String) -> Notification {
        let n = Notification {
            id: self.fresh_id(),
            user_id,
            kind,
            title,
            message,
            category: "general".into(),
            action_url: None,
            read: false,
            created_at: Utc::now(),
        };
        self.notifications.lock().unwrap().insert(0, n.clone());
        n
    }
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn get_notifications(
        &self,
        user_id: &UserId,
        query: &NotificationQuery,
    ) -> Result<NotificationPage> {
        self.check("get_notifications")?;

        let scripted = self.scripted_pages.lock().unwrap().pop_front();
        if let Some((page, gate)) = scripted {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            return Ok(page);
        }

        let filters = query.filters();
        let all: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| &n.user_id == user_id && filters.matches(n))
            .cloned()
            .collect();
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(20).max(1);
        let total = all.len() as u32;
        let unread = all.iter().filter(|n| !n.read).count() as u32;
        let notifications = all
            .into_iter()
            .skip(((page - 1) * page_size) as usize)
            .take(page_size as usize)
            .collect();

        Ok(NotificationPage {
            notifications,
            unread_count: unread,
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        })
    }

    async fn create_notification(&self, request: CreateNotificationRequest) -> Result<Notification> {
        self.check("create_notification")?;
        let mut n = self.store(
            request.user_id,
            request.draft.kind,
            request.draft.title,
            request.draft.message,
        );
        n.category = request.draft.category;
        n.action_url = request.draft.action_url;
        if let Some(stored) = self.notifications.lock().unwrap().first_mut() {
            *stored = n.clone();
        }
        Ok(n)
    }

    async fn create_from_template(
        &self,
        template_id: &str,
        request: TemplateNotificationRequest,
    ) -> Result<Notification> {
        self.check("create_from_template")?;
        let tour = request.params.get("tour").cloned().unwrap_or_default();
        Ok(self.store(
            request.user_id,
            NotificationKind::Success,
            format!("{template_id}: {tour}"),
            format!("Template {template_id}"),
        ))
    }

    async fn mark_as_read(&self, id: &NotificationId) -> Result<Notification> {
        self.check("mark_as_read")?;
        let mut list = self.notifications.lock().unwrap();
        let n = list
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| ClientError::Status {
                status: 404,
                message: "Notification not found".into(),
            })?;
        n.read = true;
        Ok(n.clone())
    }

    async fn mark_all_as_read(&self, user_id: &UserId) -> Result<()> {
        self.check("mark_all_as_read")?;
        for n in self.notifications.lock().unwrap().iter_mut() {
            if &n.user_id == user_id {
                n.read = true;
            }
        }
        Ok(())
    }

    async fn delete_notification(&self, id: &NotificationId) -> Result<()> {
        self.check("delete_notification")?;
        self.notifications.lock().unwrap().retain(|n| &n.id != id);
        Ok(())
    }

    async fn clear_all(&self, user_id: &UserId) -> Result<()> {
        self.check("clear_all")?;
        self.notifications
            .lock()
            .unwrap()
            .retain(|n| &n.user_id != user_id);
        Ok(())
    }

    async fn get_user_preferences(&self, _user_id: &UserId) -> Result<NotificationPreferences> {
        self.check("get_user_preferences")?;
        Ok(self.preferences.lock().unwrap().clone())
    }

    async fn update_user_preferences(
        &self,
        _user_id: &UserId,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        self.check("update_user_preferences")?;
        *self.preferences.lock().unwrap() = prefs.clone();
        Ok(prefs.clone())
    }

    async fn subscribe_push(&self, subscription: &PushSubscription) -> Result<()> {
        self.check("subscribe_push")?;
        self.subscriptions.lock().unwrap().push(subscription.clone());
        Ok(())
    }

    async fn unsubscribe_push(&self, subscription: &PushSubscription) -> Result<()> {
        self.check("unsubscribe_push")?;
        self.subscriptions
            .lock()
            .unwrap()
            .retain(|s| s != subscription);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

pub struct RecordingNotifier {
    pub permission: Mutex<Permission>,
    pub sounds: Mutex<Vec<NotificationKind>>,
    pub pushes: Mutex<Vec<NotificationId>>,
    pub fail_display: bool,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            sounds: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            fail_display: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_display: true,
            ..Self::new(Permission::Granted)
        }
    }
}

#[async_trait]
impl PlatformNotifier for RecordingNotifier {
    async fn request_permission(&self) -> Permission {
        *self.permission.lock().unwrap()
    }

    fn show_push(&self, notification: &Notification) -> std::result::Result<(), PlatformError> {
        if self.fail_display {
            return Err(PlatformError::Display("no notification daemon".into()));
        }
        self.pushes.lock().unwrap().push(notification.id.clone());
        Ok(())
    }

    fn play_sound(&self, kind: NotificationKind) -> std::result::Result<(), PlatformError> {
        if self.fail_display {
            return Err(PlatformError::Audio("no audio device".into()));
        }
        self.sounds.lock().unwrap().push(kind);
        Ok(())
    }

    fn push_endpoint(&self) -> Option<String> {
        Some("https://push.example.test/device-1".into())
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

pub fn profile(id: &str, name: &str, role: UserRole) -> UserProfile {
    UserProfile {
        id: UserId::from(id),
        name: name.into(),
        avatar: Some(format!("https://cdn.example.test/{id}.png")),
        role: Some(role),
    }
}

pub fn remote_conversation(
    id: &str,
    kind: ConversationType,
    members: &[UserProfile],
    last: Option<&str>,
    unread: u32,
) -> RemoteConversation {
    let created_at = Utc::now() - Duration::hours(1);
    RemoteConversation {
        id: ConversationId::from(id),
        kind,
        name: None,
        participants: members
            .iter()
            .map(|u| Participant {
                user_id: u.id.clone(),
                user: u.clone(),
            })
            .collect(),
        last_message: last.map(|content| RemoteMessage {
            id: MessageId::new(format!("{id}-last")),
            conversation_id: ConversationId::from(id),
            sender_id: members[0].id.clone(),
            content: content.into(),
            kind: MessageKind::Text,
            created_at: Utc::now(),
            edited_at: None,
            read_by: Vec::new(),
        }),
        unread_count: unread,
        created_at,
    }
}

#[derive(Default)]
pub struct MockChatService {
    pub conversations: Mutex<Vec<RemoteConversation>>,
    pub directory: Mutex<Vec<UserProfile>>,
    pub read_marks: Mutex<Vec<(ConversationId, UserId)>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: Mutex<u32>,
}

impl MockChatService {
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing.lock().unwrap().contains(op) {
            Err(mock_failure(op))
        } else {
            Ok(())
        }
    }

    fn lookup(&self, id: &UserId) -> UserProfile {
        self.directory
            .lock()
            .unwrap()
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .unwrap_or_else(|| UserProfile {
                id: id.clone(),
                name: id.to_string(),
                avatar: None,
                role: None,
            })
    }
}

#[async_trait]
impl ChatService for MockChatService {
    async fn get_conversations(&self, user_id: &UserId) -> Result<Vec<RemoteConversation>> {
        self.check("get_conversations")?;
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect())
    }

    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> Result<RemoteConversation> {
        self.check("create_conversation")?;
        let mut wanted = request.participants.clone();
        wanted.sort();
        wanted.dedup();

        let mut list = self.conversations.lock().unwrap();
        if request.kind == ConversationType::Direct {
            let existing = list.iter().find(|c| {
                let mut ids: Vec<UserId> = c.participants.iter().map(|p| p.user_id.clone()).collect();
                ids.sort();
                c.kind == ConversationType::Direct && ids == wanted
            });
            if let Some(existing) = existing {
                return Ok(existing.clone());
            }
        }

        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let conversation = RemoteConversation {
            id: ConversationId::new(format!("conv-{}", *next)),
            kind: request.kind,
            name: request.name,
            participants: wanted
                .iter()
                .map(|id| Participant {
                    user_id: id.clone(),
                    user: self.lookup(id),
                })
                .collect(),
            last_message: None,
            unread_count: 0,
            created_at: Utc::now(),
        };
        list.push(conversation.clone());
        Ok(conversation)
    }

    async fn get_messages(
        &self,
        _conversation_id: &ConversationId,
        _query: MessagesQuery,
    ) -> Result<Vec<RemoteMessage>> {
        self.check("get_messages")?;
        Ok(Vec::new())
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        request: SendMessageRequest,
    ) -> Result<RemoteMessage> {
        self.check("send_message")?;
        Ok(RemoteMessage {
            id: MessageId::generate(),
            conversation_id: conversation_id.clone(),
            sender_id: request.sender_id,
            content: request.content,
            kind: request.kind,
            created_at: Utc::now(),
            edited_at: None,
            read_by: Vec::new(),
        })
    }

    async fn mark_as_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        _message_id: Option<&MessageId>,
    ) -> Result<()> {
        self.check("mark_as_read")?;
        self.read_marks
            .lock()
            .unwrap()
            .push((conversation_id.clone(), user_id.clone()));
        Ok(())
    }

    async fn edit_message(&self, _message_id: &MessageId, _content: &str) -> Result<RemoteMessage> {
        Err(mock_failure("edit_message"))
    }

    async fn delete_message(&self, _message_id: &MessageId) -> Result<()> {
        self.check("delete_message")
    }

    async fn add_participant(
        &self,
        _conversation_id: &ConversationId,
        _user_id: &UserId,
    ) -> Result<RemoteConversation> {
        Err(mock_failure("add_participant"))
    }

    async fn remove_participant(
        &self,
        _conversation_id: &ConversationId,
        _user_id: &UserId,
    ) -> Result<RemoteConversation> {
        Err(mock_failure("remove_participant"))
    }
}
