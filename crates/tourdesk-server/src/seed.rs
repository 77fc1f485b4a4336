//! Demo data loaded when `SEED_DEMO` is on.

use std::collections::BTreeMap;

use tracing::info;

use tourdesk_shared::models::UserProfile;
use tourdesk_shared::protocol::{CreateConversationRequest, SendMessageRequest};
use tourdesk_shared::types::{ConversationType, MessageKind, UserId, UserRole};

use crate::chat::ChatRepo;
use crate::error::Result;
use crate::notifications::NotificationRepo;

fn user(id: &str, name: &str, role: UserRole) -> UserProfile {
    UserProfile {
        id: id.into(),
        name: name.to_string(),
        avatar: Some(format!("/avatars/{id}.png")),
        role: Some(role),
    }
}

fn text(sender: &UserId, content: &str) -> SendMessageRequest {
    SendMessageRequest {
        sender_id: sender.clone(),
        content: content.to_string(),
        kind: MessageKind::Text,
    }
}

pub fn seed_demo(chat: &mut ChatRepo, notifications: &mut NotificationRepo) -> Result<()> {
    let agent = user("agent-1", "Agent", UserRole::Agency);
    let guide = user("guide-carlos", "Carlos", UserRole::Guide);
    let client = user("client-eva", "Eva Lind", UserRole::Client);
    let admin = user("admin-1", "Operations", UserRole::Admin);
    let (agent_id, guide_id, client_id) = (agent.id.clone(), guide.id.clone(), client.id.clone());
    for profile in [agent, guide, client, admin] {
        chat.upsert_user(profile);
    }

    let direct = chat.create_or_get(CreateConversationRequest {
        participants: vec![agent_id.clone(), guide_id.clone()],
        kind: ConversationType::Direct,
        name: None,
    })?;
    chat.send(&direct.id, text(&guide_id, "The group is at the meeting point."))?;
    chat.send(&direct.id, text(&agent_id, "Thanks, the bus is five minutes away."))?;
    chat.send(&direct.id, text(&guide_id, "Two guests are running late."))?;

    let group = chat.create_or_get(CreateConversationRequest {
        participants: vec![agent_id.clone(), guide_id.clone(), client_id],
        kind: ConversationType::Group,
        name: Some("Porto Food Tour".to_string()),
    })?;
    chat.send(&group.id, text(&agent_id, "Welcome aboard! Lunch is at 13:00."))?;

    let params = BTreeMap::from([
        ("tour".to_string(), "Porto Food Tour".to_string()),
        ("client".to_string(), "Eva Lind".to_string()),
        ("date".to_string(), "Saturday".to_string()),
        ("guide".to_string(), "Carlos".to_string()),
    ]);
    notifications.create_from_template("booking-confirmed", agent_id.clone(), &params)?;
    notifications.create_from_template("guide-assigned", agent_id.clone(), &params)?;
    notifications.create_from_template("booking-cancelled", agent_id, &params)?;

    info!("Demo data seeded");
    Ok(())
}
