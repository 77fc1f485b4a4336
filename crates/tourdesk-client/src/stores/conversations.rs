//! Conversation state store.
//!
//! The single source of truth for chat message logs. Views read cloned
//! snapshots and mutate only through the operations below; every mutation
//! re-persists the whole map and publishes a [`ConversationEvent`].
//!
//! None of the operations fail: they are synchronous and local. A storage
//! write error is logged and the in-memory state stays authoritative.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use tourdesk_shared::constants::CONVERSATIONS_STORAGE_KEY;
use tourdesk_shared::models::{Conversation, Message, MessagePatch};
use tourdesk_shared::types::{ConversationId, MessageId};
use tourdesk_store::{load_state, save_state, KeyValueStorage};

use crate::events::{ConversationEvent, EVENT_CHANNEL_CAPACITY};

/// Result of [`ConversationStore::update_message`]. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The message exists but the patch changed nothing (or only tried to
    /// move its status backwards).
    Unchanged,
    MissingConversation,
    MissingMessage,
}

/// Persisted shape. Entries stay raw so one undecodable conversation does
/// not take the others down with it.
#[derive(Default, Deserialize)]
struct PersistedConversations {
    conversations: HashMap<ConversationId, serde_json::Value>,
}

impl PersistedConversations {
    fn decode(self) -> HashMap<ConversationId, Conversation> {
        self.conversations
            .into_iter()
            .filter_map(|(id, raw)| match serde_json::from_value::<Conversation>(raw) {
                Ok(conversation) => Some((id, conversation)),
                Err(e) => {
                    warn!(conversation = %id, error = %e, "Skipping unreadable persisted conversation");
                    None
                }
            })
            .collect()
    }
}

pub struct ConversationStore {
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
    storage: Arc<dyn KeyValueStorage>,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationStore {
    /// Build the store, rehydrating whatever was persisted in `storage`.
    ///
    /// Unreadable persisted state is logged and replaced by an empty map;
    /// a single unreadable conversation is dropped on its own.
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        let conversations =
            match load_state::<PersistedConversations>(storage.as_ref(), CONVERSATIONS_STORAGE_KEY) {
                Ok(Some(state)) => {
                    let conversations = state.decode();
                    info!(count = conversations.len(), "Rehydrated conversations");
                    conversations
                }
                Ok(None) => HashMap::new(),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted conversations");
                    HashMap::new()
                }
            };

        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            conversations: Mutex::new(conversations),
            storage,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Ordered messages of `conversation_id`, or an empty list if unknown.
    pub fn get_messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.lock()
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    pub fn get_conversation(&self, conversation_id: &ConversationId) -> Option<Conversation> {
        self.lock().get(conversation_id).cloned()
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.lock().contains_key(conversation_id)
    }

    /// Ids of every known conversation, most recently updated first.
    pub fn conversation_ids(&self) -> Vec<ConversationId> {
        let map = self.lock();
        let mut entries: Vec<_> = map.values().map(|c| (c.updated_at, c.id.clone())).collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Append `message`, creating the conversation if needed.
    ///
    /// Never reorders or deduplicates: callers own id uniqueness.
    pub fn add_message(&self, conversation_id: &ConversationId, message: Message) {
        let message_id = message.id.clone();
        {
            let mut map = self.lock();
            let conversation = map
                .entry(conversation_id.clone())
                .or_insert_with(|| Conversation::new(conversation_id.clone(), Vec::new()));
            conversation.messages.push(message);
            conversation.updated_at = Utc::now();
            self.persist(&map);
        }

        debug!(conversation = %conversation_id, message = %message_id, "Message appended");
        self.publish(ConversationEvent::MessageAdded {
            conversation_id: conversation_id.clone(),
            message_id,
        });
    }

    /// Merge `patch` into one message, leaving every other message untouched.
    ///
    /// An unknown conversation or message is a silent no-op; late status
    /// timers racing a cleared conversation rely on this.
    pub fn update_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> UpdateOutcome {
        let outcome = {
            let mut map = self.lock();
            match map.get_mut(conversation_id) {
                None => UpdateOutcome::MissingConversation,
                Some(conversation) => match conversation.find_mut(message_id) {
                    None => UpdateOutcome::MissingMessage,
                    Some(message) => {
                        if message.apply_patch(patch) {
                            conversation.updated_at = Utc::now();
                            self.persist(&map);
                            UpdateOutcome::Applied
                        } else {
                            UpdateOutcome::Unchanged
                        }
                    }
                },
            }
        };

        match outcome {
            UpdateOutcome::Applied => {
                debug!(conversation = %conversation_id, message = %message_id, "Message updated");
                self.publish(ConversationEvent::MessageUpdated {
                    conversation_id: conversation_id.clone(),
                    message_id: message_id.clone(),
                });
            }
            UpdateOutcome::Unchanged => {
                debug!(conversation = %conversation_id, message = %message_id, "Patch left message unchanged");
            }
            UpdateOutcome::MissingConversation => {
                debug!(conversation = %conversation_id, message = %message_id, "Update skipped: conversation not found");
            }
            UpdateOutcome::MissingMessage => {
                debug!(conversation = %conversation_id, message = %message_id, "Update skipped: message not found in conversation");
            }
        }

        outcome
    }

    /// Create `conversation_id` with `initial` unless it already exists.
    ///
    /// First writer wins. Returns whether the conversation was created.
    pub fn init_conversation(&self, conversation_id: &ConversationId, initial: Vec<Message>) -> bool {
        {
            let mut map = self.lock();
            if map.contains_key(conversation_id) {
                debug!(conversation = %conversation_id, "Conversation already initialized");
                return false;
            }
            let count = initial.len();
            map.insert(
                conversation_id.clone(),
                Conversation::new(conversation_id.clone(), initial),
            );
            self.persist(&map);
            info!(conversation = %conversation_id, messages = count, "Conversation initialized");
        }

        self.publish(ConversationEvent::Initialized {
            conversation_id: conversation_id.clone(),
        });
        true
    }

    /// Remove one conversation. Returns whether it existed.
    pub fn clear_conversation(&self, conversation_id: &ConversationId) -> bool {
        let removed = {
            let mut map = self.lock();
            let removed = map.remove(conversation_id).is_some();
            if removed {
                self.persist(&map);
            }
            removed
        };

        if removed {
            info!(conversation = %conversation_id, "Conversation cleared");
            self.publish(ConversationEvent::Cleared {
                conversation_id: conversation_id.clone(),
            });
        }
        removed
    }

    pub fn clear_all_conversations(&self) {
        {
            let mut map = self.lock();
            map.clear();
            self.persist(&map);
        }
        info!("All conversations cleared");
        self.publish(ConversationEvent::ClearedAll);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConversationId, Conversation>> {
        // A panic mid-mutation leaves the map usable; keep serving it.
        self.conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the full map. Called with the lock held so writes land in
    /// mutation order.
    fn persist(&self, map: &HashMap<ConversationId, Conversation>) {
        #[derive(Serialize)]
        struct View<'a> {
            conversations: &'a HashMap<ConversationId, Conversation>,
        }

        if let Err(e) = save_state(
            self.storage.as_ref(),
            CONVERSATIONS_STORAGE_KEY,
            &View { conversations: map },
        ) {
            warn!(error = %e, "Failed to persist conversations");
        }
    }

    fn publish(&self, event: ConversationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
