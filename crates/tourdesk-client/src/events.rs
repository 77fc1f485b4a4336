use tourdesk_shared::types::{ConversationId, MessageId};

/// Capacity of the conversation event channel. Slow subscribers that fall
/// further behind see `Lagged` and should resynchronise from a snapshot.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Published by the conversation store after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    Initialized {
        conversation_id: ConversationId,
    },
    MessageAdded {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    MessageUpdated {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    Cleared {
        conversation_id: ConversationId,
    },
    ClearedAll,
}

impl ConversationEvent {
    /// Whether this event changes the message list of `conversation_id`.
    pub fn affects(&self, conversation_id: &ConversationId) -> bool {
        match self {
            ConversationEvent::Initialized { conversation_id: id }
            | ConversationEvent::MessageAdded { conversation_id: id, .. }
            | ConversationEvent::MessageUpdated { conversation_id: id, .. }
            | ConversationEvent::Cleared { conversation_id: id } => id == conversation_id,
            ConversationEvent::ClearedAll => true,
        }
    }
}
