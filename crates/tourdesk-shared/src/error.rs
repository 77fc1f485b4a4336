use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown message type: {0}")]
    UnknownMessageKind(String),

    #[error("Unknown notification type: {0}")]
    UnknownNotificationKind(String),

    #[error("Missing template parameter: {0}")]
    MissingTemplateParam(String),
}
