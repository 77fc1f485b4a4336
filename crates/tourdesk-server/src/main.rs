//! # tourdesk-server
//!
//! Mock backend for the Tourdesk back-office client.
//!
//! Serves the chat and notification REST endpoints the client talks to,
//! backed by in-memory repositories:
//! - **Chat**: conversations, paged message history, read receipts,
//!   participants
//! - **Notifications**: filtered listing, templates, preferences and push
//!   subscriptions

mod api;
mod chat;
mod config;
mod error;
mod notifications;
mod seed;
mod templates;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::chat::ChatRepo;
use crate::config::ServerConfig;
use crate::notifications::NotificationRepo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tourdesk_server=debug")),
        )
        .init();

    info!("Starting Tourdesk backend v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build repositories
    // -----------------------------------------------------------------------
    let mut chat = ChatRepo::new();
    let mut notifications = NotificationRepo::new();
    if config.seed_demo {
        seed::seed_demo(&mut chat, &mut notifications)?;
    }

    let http_addr = config.http_addr;
    let app_state = AppState::new(config, chat, notifications);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server until shutdown
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
