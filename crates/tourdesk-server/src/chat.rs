//! In-memory chat repository.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use tourdesk_shared::models::{Participant, RemoteConversation, RemoteMessage, UserProfile};
use tourdesk_shared::protocol::{CreateConversationRequest, SendMessageRequest};
use tourdesk_shared::types::{ConversationId, ConversationType, MessageId, UserId};

use crate::error::{Result, ServerError};

#[derive(Debug, Clone)]
struct StoredConversation {
    id: ConversationId,
    kind: ConversationType,
    name: Option<String>,
    /// Sorted and deduplicated.
    participants: Vec<UserId>,
    /// Chronological.
    messages: Vec<RemoteMessage>,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ChatRepo {
    users: HashMap<UserId, UserProfile>,
    conversations: Vec<StoredConversation>,
}

impl ChatRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_user(&mut self, profile: UserProfile) {
        self.users.insert(profile.id.clone(), profile);
    }

    /// Conversations `user_id` takes part in, most recent activity first,
    /// with unread counts as seen by that user.
    pub fn conversations_for(&self, user_id: &UserId) -> Vec<RemoteConversation> {
        let mut list: Vec<_> = self
            .conversations
            .iter()
            .filter(|c| c.participants.contains(user_id))
            .collect();
        list.sort_by_key(|c| {
            std::cmp::Reverse(c.messages.last().map_or(c.created_at, |m| m.created_at))
        });
        list.into_iter().map(|c| self.view(c, Some(user_id))).collect()
    }

    /// Create a conversation, or return the existing direct conversation
    /// between the same participants.
    pub fn create_or_get(&mut self, request: CreateConversationRequest) -> Result<RemoteConversation> {
        let mut participants = request.participants;
        participants.sort();
        participants.dedup();
        if participants.is_empty() {
            return Err(ServerError::BadRequest("participants must not be empty".into()));
        }
        let creator = participants.first().cloned();

        if request.kind == ConversationType::Direct {
            if participants.len() != 2 {
                return Err(ServerError::BadRequest(
                    "direct conversations need exactly two participants".into(),
                ));
            }
            if let Some(existing) = self
                .conversations
                .iter()
                .find(|c| c.kind == ConversationType::Direct && c.participants == participants)
            {
                debug!(conversation = %existing.id, "Returning existing direct conversation");
                return Ok(self.view(existing, creator.as_ref()));
            }
        }

        let stored = StoredConversation {
            id: ConversationId::new(uuid::Uuid::new_v4().to_string()),
            kind: request.kind,
            name: request.name,
            participants,
            messages: Vec::new(),
            created_at: Utc::now(),
        };
        info!(conversation = %stored.id, kind = ?stored.kind, "Conversation created");
        let view = self.view(&stored, creator.as_ref());
        self.conversations.push(stored);
        Ok(view)
    }

    /// One page of history. Page 1 holds the newest `limit` messages; each
    /// page is in chronological order.
    pub fn messages(&self, id: &ConversationId, page: u32, limit: u32) -> Result<Vec<RemoteMessage>> {
        let conversation = self.find(id)?;
        let limit = limit.max(1) as usize;
        let skip = (page.max(1) as usize - 1) * limit;
        let total = conversation.messages.len();
        let end = total.saturating_sub(skip);
        let start = end.saturating_sub(limit);
        Ok(conversation.messages[start..end].to_vec())
    }

    pub fn send(&mut self, id: &ConversationId, request: SendMessageRequest) -> Result<RemoteMessage> {
        let conversation = self.find_mut(id)?;
        if !conversation.participants.contains(&request.sender_id) {
            return Err(ServerError::BadRequest(format!(
                "{} is not a participant of {id}",
                request.sender_id
            )));
        }
        let message = RemoteMessage {
            id: MessageId::generate(),
            conversation_id: id.clone(),
            sender_id: request.sender_id.clone(),
            content: request.content,
            kind: request.kind,
            created_at: Utc::now(),
            edited_at: None,
            read_by: vec![request.sender_id],
        };
        conversation.messages.push(message.clone());
        debug!(conversation = %id, message = %message.id, "Message stored");
        Ok(message)
    }

    /// Mark messages read by `user_id`, up to and including `up_to` when
    /// given. Returns how many messages changed.
    pub fn mark_read(
        &mut self,
        id: &ConversationId,
        user_id: &UserId,
        up_to: Option<&MessageId>,
    ) -> Result<usize> {
        let conversation = self.find_mut(id)?;
        let end = match up_to {
            Some(message_id) => {
                conversation
                    .messages
                    .iter()
                    .position(|m| &m.id == message_id)
                    .ok_or_else(|| ServerError::MessageNotFound(message_id.to_string()))?
                    + 1
            }
            None => conversation.messages.len(),
        };

        let mut changed = 0;
        for message in &mut conversation.messages[..end] {
            if !message.read_by.contains(user_id) {
                message.read_by.push(user_id.clone());
                changed += 1;
            }
        }
        debug!(conversation = %id, user = %user_id, changed, "Messages marked read");
        Ok(changed)
    }

    pub fn edit(&mut self, message_id: &MessageId, content: String) -> Result<RemoteMessage> {
        let message = self
            .conversations
            .iter_mut()
            .flat_map(|c| c.messages.iter_mut())
            .find(|m| &m.id == message_id)
            .ok_or_else(|| ServerError::MessageNotFound(message_id.to_string()))?;
        message.content = content;
        message.edited_at = Some(Utc::now());
        Ok(message.clone())
    }

    pub fn delete(&mut self, message_id: &MessageId) -> Result<()> {
        for conversation in &mut self.conversations {
            if let Some(pos) = conversation.messages.iter().position(|m| &m.id == message_id) {
                conversation.messages.remove(pos);
                return Ok(());
            }
        }
        Err(ServerError::MessageNotFound(message_id.to_string()))
    }

    pub fn add_participant(&mut self, id: &ConversationId, user_id: UserId) -> Result<RemoteConversation> {
        let conversation = self.find_mut(id)?;
        if conversation.kind == ConversationType::Direct {
            return Err(ServerError::BadRequest(
                "participants of a direct conversation are fixed".into(),
            ));
        }
        if let Err(pos) = conversation.participants.binary_search(&user_id) {
            conversation.participants.insert(pos, user_id);
        }
        let conversation = self.find(id)?;
        Ok(self.view(conversation, None))
    }

    pub fn remove_participant(&mut self, id: &ConversationId, user_id: &UserId) -> Result<RemoteConversation> {
        let conversation = self.find_mut(id)?;
        if conversation.kind == ConversationType::Direct {
            return Err(ServerError::BadRequest(
                "participants of a direct conversation are fixed".into(),
            ));
        }
        conversation.participants.retain(|p| p != user_id);
        let conversation = self.find(id)?;
        Ok(self.view(conversation, None))
    }

    fn find(&self, id: &ConversationId) -> Result<&StoredConversation> {
        self.conversations
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| ServerError::ConversationNotFound(id.to_string()))
    }

    fn find_mut(&mut self, id: &ConversationId) -> Result<&mut StoredConversation> {
        self.conversations
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| ServerError::ConversationNotFound(id.to_string()))
    }

    fn profile(&self, id: &UserId) -> UserProfile {
        self.users.get(id).cloned().unwrap_or_else(|| UserProfile {
            id: id.clone(),
            name: id.to_string(),
            avatar: None,
            role: None,
        })
    }

    fn view(&self, c: &StoredConversation, viewer: Option<&UserId>) -> RemoteConversation {
        let unread_count = viewer.map_or(0, |viewer| {
            c.messages
                .iter()
                .filter(|m| &m.sender_id != viewer && !m.read_by.contains(viewer))
                .count() as u32
        });
        RemoteConversation {
            id: c.id.clone(),
            kind: c.kind,
            name: c.name.clone(),
            participants: c
                .participants
                .iter()
                .map(|id| Participant {
                    user_id: id.clone(),
                    user: self.profile(id),
                })
                .collect(),
            last_message: c.messages.last().cloned(),
            unread_count,
            created_at: c.created_at,
        }
    }
}
