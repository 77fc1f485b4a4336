use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use tourdesk_client::config::ClientConfig;
use tourdesk_client::hooks::ChatOrigin;
use tourdesk_client::platform::TracingNotifier;
use tourdesk_client::state::{AppState, SessionUser};
use tourdesk_shared::constants::APP_NAME;
use tourdesk_shared::types::UserRole;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tourdesk_client::init_tracing();

    let config = ClientConfig::from_env();
    info!(api = %config.api_base_url, "Starting {APP_NAME} client");

    let session = SessionUser {
        id: std::env::var("TOURDESK_USER_ID")
            .unwrap_or_else(|_| "agent-1".to_string())
            .into(),
        name: std::env::var("TOURDESK_USER_NAME").unwrap_or_else(|_| "Agent".to_string()),
        role: UserRole::Agency,
    };
    let read_delay = config.receipt_delays.read;

    let state = AppState::bootstrap(config, session, Arc::new(TracingNotifier::default()))
        .context("Failed to initialise client state")?;

    let mut window = state.open_chat(
        "agenda-demo".into(),
        ChatOrigin::Agenda {
            tour_name: "Old Town Walking Tour".to_string(),
        },
    );
    window.set_compose_text("Hola");
    if let Some(id) = window.handle_send_message() {
        tokio::time::sleep(read_delay + std::time::Duration::from_millis(50)).await;
        let status = window
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .and_then(|m| m.status);
        info!(message = %id, ?status, "Receipt lifecycle finished");
    }

    let mut chats = state.chat_list();
    match chats.load().await {
        Ok(()) => info!(count = chats.chats().len(), "Conversations loaded"),
        Err(e) => warn!(error = %e, "Chat backend unavailable"),
    }

    let mut bell = state.notification_bell();
    bell.toggle().await;
    if let Some(feedback) = bell.take_feedback() {
        warn!(action = feedback.action, message = %feedback.message, "Notification center unavailable");
    } else {
        info!(badge = %bell.badge(), "Notification center refreshed");
    }

    Ok(())
}
