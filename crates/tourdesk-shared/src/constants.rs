/// Application name
pub const APP_NAME: &str = "Tourdesk";

/// Reserved sender id for messages authored by the local user
pub const CURRENT_USER_SENDER: &str = "current-user";

/// Reserved sender id for application-generated messages
pub const SYSTEM_SENDER: &str = "system";

/// Delay before a freshly sent message is marked delivered (milliseconds)
pub const DELIVERED_DELAY_MS: u64 = 1_000;

/// Delay before a freshly sent message is marked read (milliseconds)
pub const READ_DELAY_MS: u64 = 2_000;

/// Storage key of the persisted conversation map
pub const CONVERSATIONS_STORAGE_KEY: &str = "chat-storage";

/// Storage key of the persisted notification settings (filters, paging, flags)
pub const NOTIFICATIONS_STORAGE_KEY: &str = "notification-storage";

/// Schema version written next to every persisted store state
pub const PERSISTED_STATE_VERSION: u32 = 1;

/// Default notification page size
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default number of messages fetched per history page
pub const DEFAULT_MESSAGE_PAGE_LIMIT: u32 = 50;

/// Default HTTP API port (mock backend)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Translation key of the system message that opens an agenda coordination chat
pub const COORDINATION_STARTED_KEY: &str = "chat.coordinationStarted";
