//! View model of an open chat window.
//!
//! Owns the transient UI state (compose text, emoji picker, pending scroll)
//! and drives the simulated receipt lifecycle of outgoing messages:
//! `sent` on append, `delivered` and `read` from scheduler timers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use tourdesk_shared::constants::COORDINATION_STARTED_KEY;
use tourdesk_shared::models::{Message, MessageContent, MessagePatch, MessagePayload};
use tourdesk_shared::types::{
    ConversationId, MessageId, MessageKind, MessageStatus, SenderId, UserId,
};

use crate::config::ReceiptDelays;
use crate::events::ConversationEvent;
use crate::scheduler::StatusScheduler;
use crate::state::SessionUser;
use crate::stores::ConversationStore;

/// How the window was reached. Decides the seed of a fresh conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOrigin {
    /// Opened from a tour in the agenda.
    Agenda { tour_name: String },
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
}

pub struct ChatWindow {
    conversation_id: ConversationId,
    user: SessionUser,
    store: Arc<ConversationStore>,
    scheduler: Arc<StatusScheduler>,
    delays: ReceiptDelays,
    events: broadcast::Receiver<ConversationEvent>,
    compose: String,
    emoji_picker_open: bool,
    scroll: Option<ScrollBehavior>,
}

impl ChatWindow {
    /// Open the window and seed the conversation if it has no history yet.
    pub fn open(
        store: Arc<ConversationStore>,
        scheduler: Arc<StatusScheduler>,
        delays: ReceiptDelays,
        user: SessionUser,
        conversation_id: ConversationId,
        origin: ChatOrigin,
    ) -> Self {
        // Subscribe before seeding so the seed itself requests a scroll.
        let events = store.subscribe();

        let seed = match &origin {
            ChatOrigin::Agenda { tour_name } => vec![Message::system(
                MessageContent::translated(COORDINATION_STARTED_KEY)
                    .with_param("tourName", tour_name.as_str()),
            )],
            ChatOrigin::Direct => demo_script(&user.name),
        };
        if store.init_conversation(&conversation_id, seed) {
            debug!(conversation = %conversation_id, ?origin, "Seeded chat window");
        }

        Self {
            conversation_id,
            user,
            store,
            scheduler,
            delays,
            events,
            compose: String::new(),
            emoji_picker_open: false,
            // Land on the latest message when opening an existing conversation.
            scroll: Some(ScrollBehavior::Smooth),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store.get_messages(&self.conversation_id)
    }

    pub fn compose_text(&self) -> &str {
        &self.compose
    }

    pub fn set_compose_text(&mut self, text: impl Into<String>) {
        self.compose = text.into();
    }

    pub fn is_emoji_picker_open(&self) -> bool {
        self.emoji_picker_open
    }

    pub fn toggle_emoji_picker(&mut self) {
        self.emoji_picker_open = !self.emoji_picker_open;
    }

    /// Append `emoji` to the compose text and close the picker.
    pub fn insert_emoji(&mut self, emoji: &str) {
        self.compose.push_str(emoji);
        self.emoji_picker_open = false;
    }

    /// Whether the current user may start voice/video calls.
    pub fn can_place_calls(&self) -> bool {
        self.user.role.can_place_calls()
    }

    /// Send the compose text. Blank input is ignored and returns `None`.
    pub fn handle_send_message(&mut self) -> Option<MessageId> {
        let text = self.compose.trim();
        if text.is_empty() {
            debug!(conversation = %self.conversation_id, "Ignoring blank message");
            return None;
        }

        let message = Message::outgoing(self.user.name.clone(), MessageContent::text(text));
        self.compose.clear();
        Some(self.dispatch(message))
    }

    /// Share a map pin. Non-finite coordinates are rejected with `None`.
    pub fn share_location(
        &mut self,
        latitude: f64,
        longitude: f64,
        label: impl Into<String>,
        address: Option<String>,
    ) -> Option<MessageId> {
        if !latitude.is_finite() || !longitude.is_finite() {
            warn!(conversation = %self.conversation_id, latitude, longitude, "Rejecting location with non-finite coordinates");
            return None;
        }
        let label = label.into();
        let message = Message::outgoing(self.user.name.clone(), MessageContent::text(label.clone()))
            .with_payload(MessagePayload::Location {
                latitude,
                longitude,
                label,
                address,
            });
        Some(self.dispatch(message))
    }

    pub fn send_document(&mut self, name: impl Into<String>, size: u64) -> MessageId {
        let name = name.into();
        let message = Message::outgoing(self.user.name.clone(), MessageContent::text(name.clone()))
            .with_payload(MessagePayload::Document { name, size });
        self.dispatch(message)
    }

    pub fn send_image(&mut self, url: impl Into<String>) -> MessageId {
        let message = Message::outgoing(self.user.name.clone(), MessageContent::text(""))
            .with_payload(MessagePayload::Image { url: url.into() });
        self.dispatch(message)
    }

    /// Drop the whole conversation, cancelling receipts still in flight.
    pub fn clear(&mut self) {
        let cancelled = self.scheduler.cancel_conversation(&self.conversation_id);
        self.store.clear_conversation(&self.conversation_id);
        info!(conversation = %self.conversation_id, cancelled, "Chat window cleared");
    }

    /// Drain store events and record a scroll request if this conversation
    /// changed. Returns whether anything changed.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => changed |= event.affects(&self.conversation_id),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(conversation = %self.conversation_id, skipped, "Chat window lagged behind store events");
                    changed = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if changed {
            self.scroll = Some(ScrollBehavior::Smooth);
        }
        changed
    }

    /// Consume the pending scroll-to-latest request, if any.
    pub fn take_scroll_request(&mut self) -> Option<ScrollBehavior> {
        self.scroll.take()
    }

    fn dispatch(&mut self, message: Message) -> MessageId {
        let message_id = message.id.clone();
        self.store.add_message(&self.conversation_id, message);
        self.schedule_receipt(&message_id, self.delays.delivered, MessageStatus::Delivered);
        self.schedule_receipt(&message_id, self.delays.read, MessageStatus::Read);
        message_id
    }

    fn schedule_receipt(&self, message_id: &MessageId, delay: Duration, status: MessageStatus) {
        let store = Arc::clone(&self.store);
        let conversation_id = self.conversation_id.clone();
        let target = message_id.clone();
        self.scheduler
            .schedule(&self.conversation_id, message_id, delay, move || {
                store.update_message(&conversation_id, &target, &MessagePatch::status(status));
            });
    }
}

/// Prior history shown when a chat is opened outside the agenda.
fn demo_script(user_name: &str) -> Vec<Message> {
    let guide = UserId::from("guide-carlos");
    let now = Utc::now();
    let at = |minutes_ago: i64| now - chrono::Duration::minutes(minutes_ago);

    let incoming = |text: &str, minutes_ago: i64| Message {
        id: MessageId::generate(),
        sender_id: SenderId::User(guide.clone()),
        sender_name: "Carlos".to_string(),
        content: MessageContent::text(text),
        timestamp: at(minutes_ago),
        kind: MessageKind::Text,
        status: None,
        payload: None,
    };
    let outgoing = |text: &str, minutes_ago: i64| {
        let mut m = Message::outgoing(user_name, MessageContent::text(text));
        m.timestamp = at(minutes_ago);
        m.status = Some(MessageStatus::Read);
        m
    };

    vec![
        incoming("Good morning! The group is gathering at the hotel lobby.", 45),
        outgoing("Great, how many guests have checked in?", 42),
        incoming("14 of 16 so far. Two are on their way.", 40),
        outgoing("Perfect. The bus arrives at 09:15.", 38),
        incoming("Understood, we will be ready.", 35),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourdesk_shared::types::UserRole;
    use tourdesk_store::MemoryStorage;

    fn user(role: UserRole) -> SessionUser {
        SessionUser {
            id: "u1".into(),
            name: "Ana".into(),
            role,
        }
    }

    fn open(origin: ChatOrigin) -> (ChatWindow, Arc<ConversationStore>, Arc<StatusScheduler>) {
        let store = Arc::new(ConversationStore::load(Arc::new(MemoryStorage::new())));
        let scheduler = Arc::new(StatusScheduler::new());
        let window = ChatWindow::open(
            store.clone(),
            scheduler.clone(),
            ReceiptDelays::default(),
            user(UserRole::Guide),
            "chat-1".into(),
            origin,
        );
        (window, store, scheduler)
    }

    fn status_of(store: &ConversationStore, id: &MessageId) -> Option<MessageStatus> {
        store
            .get_messages(&"chat-1".into())
            .into_iter()
            .find(|m| &m.id == id)
            .and_then(|m| m.status)
    }

    #[tokio::test]
    async fn agenda_origin_seeds_one_system_message() {
        let (window, _, _) = open(ChatOrigin::Agenda {
            tour_name: "Porto Food Tour".into(),
        });

        let messages = window.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::System);
        assert_eq!(messages[0].status, None);
        match &messages[0].content {
            MessageContent::Translated { key, params } => {
                assert_eq!(key, COORDINATION_STARTED_KEY);
                assert_eq!(params["tourName"], "Porto Food Tour");
            }
            other => panic!("expected translated content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reopening_does_not_reseed() {
        let (mut window, store, scheduler) = open(ChatOrigin::Direct);
        let seeded = window.messages().len();
        window.set_compose_text("extra");
        window.handle_send_message();

        let reopened = ChatWindow::open(
            store,
            scheduler,
            ReceiptDelays::default(),
            user(UserRole::Guide),
            "chat-1".into(),
            ChatOrigin::Agenda {
                tour_name: "ignored".into(),
            },
        );
        assert_eq!(reopened.messages().len(), seeded + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sent_message_walks_through_receipts() {
        let (mut window, store, _) = open(ChatOrigin::Direct);
        window.set_compose_text("Hola");

        let id = window.handle_send_message().unwrap();

        assert_eq!(window.compose_text(), "");
        let last = window.messages().pop().unwrap();
        assert_eq!(last.content, MessageContent::text("Hola"));
        assert_eq!(last.sender_id, SenderId::CurrentUser);
        assert_eq!(status_of(&store, &id), Some(MessageStatus::Sent));

        tokio::time::sleep(Duration::from_millis(1_001)).await;
        assert_eq!(status_of(&store, &id), Some(MessageStatus::Delivered));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(status_of(&store, &id), Some(MessageStatus::Read));
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let (mut window, _, scheduler) = open(ChatOrigin::Direct);
        let before = window.messages().len();
        window.set_compose_text("   \n\t");

        assert!(window.handle_send_message().is_none());
        assert_eq!(window.messages().len(), before);
        assert_eq!(window.compose_text(), "   \n\t");
        assert_eq!(scheduler.pending_total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_cancels_pending_receipts() {
        let (mut window, store, scheduler) = open(ChatOrigin::Direct);
        window.set_compose_text("bye");
        window.handle_send_message().unwrap();
        assert_eq!(scheduler.pending_total(), 2);

        window.clear();

        assert_eq!(scheduler.pending_total(), 0);
        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert!(!store.contains(&"chat-1".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn late_receipt_after_external_clear_is_harmless() {
        let (mut window, store, _) = open(ChatOrigin::Direct);
        window.set_compose_text("late");
        window.handle_send_message().unwrap();

        // Cleared behind the window's back: timers still fire.
        store.clear_conversation(&"chat-1".into());
        tokio::time::sleep(Duration::from_millis(3_000)).await;

        assert!(!store.contains(&"chat-1".into()));
    }

    #[tokio::test]
    async fn typed_sends_carry_payloads() {
        let (mut window, _, _) = open(ChatOrigin::Direct);

        assert!(window.share_location(41.1496, -8.6109, "Ribeira", None).is_some());
        window.send_document("itinerary.pdf", 48_213);
        window.send_image("https://cdn.example.test/group.jpg");

        let kinds: Vec<MessageKind> = window.messages().iter().rev().take(3).map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MessageKind::Image, MessageKind::Document, MessageKind::Location]);
        assert!(window
            .messages()
            .iter()
            .rev()
            .take(3)
            .all(|m| m.status == Some(MessageStatus::Sent)));
    }

    #[test]
    fn sending_outside_a_runtime_keeps_the_message_as_sent() {
        let (mut window, store, scheduler) = open(ChatOrigin::Direct);
        window.set_compose_text("no runtime here");

        let id = window.handle_send_message().unwrap();

        assert_eq!(status_of(&store, &id), Some(MessageStatus::Sent));
        assert_eq!(scheduler.pending_total(), 0);
    }

    #[tokio::test]
    async fn non_finite_coordinates_are_not_shared() {
        let (mut window, _, _) = open(ChatOrigin::Direct);
        let before = window.messages().len();

        assert!(window.share_location(f64::NAN, -8.6, "Pin", None).is_none());
        assert!(window.share_location(41.1, f64::INFINITY, "Pin", None).is_none());

        assert_eq!(window.messages().len(), before);
    }

    #[tokio::test]
    async fn emoji_insert_closes_picker() {
        let (mut window, _, _) = open(ChatOrigin::Direct);
        window.set_compose_text("Nice ");
        window.toggle_emoji_picker();
        assert!(window.is_emoji_picker_open());

        window.insert_emoji("🎉");

        assert_eq!(window.compose_text(), "Nice 🎉");
        assert!(!window.is_emoji_picker_open());
    }

    #[tokio::test]
    async fn changes_request_scroll_only_for_this_conversation() {
        let (mut window, store, _) = open(ChatOrigin::Direct);
        window.sync();
        assert_eq!(window.take_scroll_request(), Some(ScrollBehavior::Smooth));
        assert_eq!(window.take_scroll_request(), None);

        store.add_message(&"other".into(), Message::system(MessageContent::text("x")));
        assert!(!window.sync());
        assert_eq!(window.take_scroll_request(), None);

        window.set_compose_text("ping");
        window.handle_send_message();
        assert!(window.sync());
        assert_eq!(window.take_scroll_request(), Some(ScrollBehavior::Smooth));
    }

    #[tokio::test]
    async fn call_permission_follows_role() {
        let store = Arc::new(ConversationStore::load(Arc::new(MemoryStorage::new())));
        let scheduler = Arc::new(StatusScheduler::new());
        let open_as = |role| {
            ChatWindow::open(
                store.clone(),
                scheduler.clone(),
                ReceiptDelays::default(),
                user(role),
                "chat-1".into(),
                ChatOrigin::Direct,
            )
        };

        assert!(open_as(UserRole::Admin).can_place_calls());
        assert!(open_as(UserRole::Agency).can_place_calls());
        assert!(open_as(UserRole::Guide).can_place_calls());
        assert!(!open_as(UserRole::Client).can_place_calls());
    }
}
