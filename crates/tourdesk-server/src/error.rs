use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use tourdesk_shared::protocol::ApiResponse;
use tourdesk_shared::ModelError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::ConversationNotFound(_)
            | ServerError::MessageNotFound(_)
            | ServerError::NotificationNotFound(_)
            | ServerError::TemplateNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BadRequest(_) | ServerError::Model(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
        };

        let body = ApiResponse::<()>::failure(message);
        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
