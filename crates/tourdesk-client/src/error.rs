use thiserror::Error;

use tourdesk_store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (connection refused, TLS, body read...).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("Server responded {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose envelope reported `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Successful envelope without the expected `data` field.
    #[error("Response missing data for {0}")]
    MissingData(String),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
