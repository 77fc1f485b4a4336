//! Chat REST service.

use std::sync::Arc;

use async_trait::async_trait;

use tourdesk_shared::models::{RemoteConversation, RemoteMessage};
use tourdesk_shared::protocol::{
    ApiResponse, ConversationsQuery, CreateConversationRequest, EditMessageRequest,
    MarkReadRequest, MessagesQuery, ParticipantRequest, SendMessageRequest,
};
use tourdesk_shared::types::{ConversationId, MessageId, UserId};

use crate::error::Result;
use crate::services::rest::{into_data, RestClient};

/// Remote chat backend.
///
/// `create_conversation` with `type = direct` is idempotent per participant
/// set on the server side; the client does not deduplicate.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn get_conversations(&self, user_id: &UserId) -> Result<Vec<RemoteConversation>>;

    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> Result<RemoteConversation>;

    async fn get_messages(
        &self,
        conversation_id: &ConversationId,
        query: MessagesQuery,
    ) -> Result<Vec<RemoteMessage>>;

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        request: SendMessageRequest,
    ) -> Result<RemoteMessage>;

    async fn mark_as_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        message_id: Option<&MessageId>,
    ) -> Result<()>;

    async fn edit_message(&self, message_id: &MessageId, content: &str) -> Result<RemoteMessage>;

    async fn delete_message(&self, message_id: &MessageId) -> Result<()>;

    async fn add_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<RemoteConversation>;

    async fn remove_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<RemoteConversation>;
}

/// [`ChatService`] over HTTP.
pub struct HttpChatService {
    rest: Arc<RestClient>,
}

impl HttpChatService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn get_conversations(&self, user_id: &UserId) -> Result<Vec<RemoteConversation>> {
        let query = ConversationsQuery {
            user_id: user_id.clone(),
        };
        let resp = self
            .rest
            .get_with_query("chat/conversations", &query)
            .await?;
        into_data(resp, "conversations")
    }

    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> Result<RemoteConversation> {
        let resp = self.rest.post("chat/conversations", &request).await?;
        into_data(resp, "conversation")
    }

    async fn get_messages(
        &self,
        conversation_id: &ConversationId,
        query: MessagesQuery,
    ) -> Result<Vec<RemoteMessage>> {
        let path = format!("chat/conversations/{conversation_id}/messages");
        let resp = self.rest.get_with_query(&path, &query).await?;
        into_data(resp, "messages")
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        request: SendMessageRequest,
    ) -> Result<RemoteMessage> {
        let path = format!("chat/conversations/{conversation_id}/messages");
        let resp = self.rest.post(&path, &request).await?;
        into_data(resp, "message")
    }

    async fn mark_as_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        message_id: Option<&MessageId>,
    ) -> Result<()> {
        let path = format!("chat/conversations/{conversation_id}/read");
        let body = MarkReadRequest {
            user_id: user_id.clone(),
            message_id: message_id.cloned(),
        };
        let _: ApiResponse<serde_json::Value> = self.rest.post(&path, &body).await?;
        Ok(())
    }

    async fn edit_message(&self, message_id: &MessageId, content: &str) -> Result<RemoteMessage> {
        let path = format!("chat/messages/{message_id}");
        let body = EditMessageRequest {
            content: content.to_string(),
        };
        let resp = self.rest.put(&path, &body).await?;
        into_data(resp, "message")
    }

    async fn delete_message(&self, message_id: &MessageId) -> Result<()> {
        let path = format!("chat/messages/{message_id}");
        let _: ApiResponse<serde_json::Value> = self.rest.delete(&path).await?;
        Ok(())
    }

    async fn add_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<RemoteConversation> {
        let path = format!("chat/conversations/{conversation_id}/participants");
        let body = ParticipantRequest {
            user_id: user_id.clone(),
        };
        let resp = self.rest.post(&path, &body).await?;
        into_data(resp, "conversation")
    }

    async fn remove_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<RemoteConversation> {
        let path = format!("chat/conversations/{conversation_id}/participants/{user_id}");
        let resp = self.rest.delete(&path).await?;
        into_data(resp, "conversation")
    }
}
