pub mod conversations;
pub mod notifications;

pub use conversations::{ConversationStore, UpdateOutcome};
pub use notifications::{
    FetchOutcome, MutationPolicy, NotificationOp, NotificationSnapshot, NotificationStore,
};
