//! Conversation list with search.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use tourdesk_shared::models::RemoteConversation;
use tourdesk_shared::protocol::CreateConversationRequest;
use tourdesk_shared::types::{ConversationId, ConversationType, UserId};

use crate::error::Result;
use crate::services::ChatService;

/// One row of the chat list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub id: ConversationId,
    pub name: String,
    pub avatar: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u32,
    pub is_group: bool,
    pub member_count: usize,
    /// The counterpart of a direct chat.
    pub other_user_id: Option<UserId>,
}

impl ChatSummary {
    /// Project a backend conversation as seen by `current_user`.
    ///
    /// Direct chats take the other participant's name and avatar; groups use
    /// their own name or, failing that, the other participants' names.
    pub fn project(conversation: &RemoteConversation, current_user: &UserId) -> Self {
        let others: Vec<_> = conversation
            .participants
            .iter()
            .filter(|p| &p.user_id != current_user)
            .collect();
        let is_group = conversation.kind == ConversationType::Group;

        let (name, avatar, other_user_id) = if is_group {
            let name = conversation.name.clone().unwrap_or_else(|| {
                others
                    .iter()
                    .map(|p| p.user.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            });
            (name, None, None)
        } else {
            match others.first() {
                Some(other) => (
                    other.user.name.clone(),
                    other.user.avatar.clone(),
                    Some(other.user_id.clone()),
                ),
                None => (conversation.name.clone().unwrap_or_default(), None, None),
            }
        };

        Self {
            id: conversation.id.clone(),
            name,
            avatar,
            last_message: conversation.last_message.as_ref().map(|m| m.content.clone()),
            last_message_at: conversation.last_message.as_ref().map(|m| m.created_at),
            unread_count: conversation.unread_count,
            is_group,
            member_count: conversation.participants.len(),
            other_user_id,
        }
    }
}

pub struct ChatList {
    service: Arc<dyn ChatService>,
    user_id: UserId,
    chats: Vec<ChatSummary>,
    search: String,
    loading: bool,
    error: Option<String>,
}

impl ChatList {
    pub fn new(service: Arc<dyn ChatService>, user_id: UserId) -> Self {
        Self {
            service,
            user_id,
            chats: Vec::new(),
            search: String::new(),
            loading: false,
            error: None,
        }
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Chats whose name contains the search text, ignoring case.
    pub fn filtered(&self) -> Vec<&ChatSummary> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return self.chats.iter().collect();
        }
        self.chats
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Reload every conversation of the current user.
    pub async fn load(&mut self) -> Result<()> {
        self.loading = true;
        self.error = None;
        let result = self.service.get_conversations(&self.user_id).await;
        self.loading = false;

        match result {
            Ok(conversations) => {
                self.chats = conversations
                    .iter()
                    .map(|c| ChatSummary::project(c, &self.user_id))
                    .collect();
                debug!(user = %self.user_id, count = self.chats.len(), "Chat list loaded");
                Ok(())
            }
            Err(e) => {
                error!(user = %self.user_id, error = %e, "Failed to load chat list");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Open (or create) the direct chat with `other`.
    ///
    /// The backend returns the existing conversation for an already-known
    /// pair; it is only inserted here if it is not listed yet.
    pub async fn start_conversation(&mut self, other: &UserId) -> Result<ChatSummary> {
        let request = CreateConversationRequest {
            participants: vec![self.user_id.clone(), other.clone()],
            kind: ConversationType::Direct,
            name: None,
        };
        let conversation = self.service.create_conversation(request).await.map_err(|e| {
            error!(other = %other, error = %e, "Failed to start conversation");
            self.error = Some(e.to_string());
            e
        })?;

        let summary = ChatSummary::project(&conversation, &self.user_id);
        if !self.chats.iter().any(|c| c.id == summary.id) {
            info!(conversation = %summary.id, other = %other, "Conversation started");
            self.chats.insert(0, summary.clone());
        }
        Ok(summary)
    }

    /// Tell the backend the conversation was read, then zero its badge.
    pub async fn mark_conversation_read(&mut self, conversation_id: &ConversationId) -> Result<()> {
        self.service
            .mark_as_read(conversation_id, &self.user_id, None)
            .await
            .map_err(|e| {
                error!(conversation = %conversation_id, error = %e, "Failed to mark conversation read");
                self.error = Some(e.to_string());
                e
            })?;

        if let Some(chat) = self.chats.iter_mut().find(|c| &c.id == conversation_id) {
            chat.unread_count = 0;
        }
        Ok(())
    }
}
