//! Key-value persistence used by the client stores.
//!
//! Stores serialize their state into a [`PersistedState`] envelope and hand
//! the JSON text to a [`KeyValueStorage`]. The storage is read once when a
//! store is constructed and written after every mutation.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tourdesk_shared::constants::PERSISTED_STATE_VERSION;

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Durable string-keyed storage of JSON documents.
pub trait KeyValueStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// On-disk envelope around a store's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState<T> {
    pub version: u32,
    pub state: T,
}

/// Read and decode the state persisted under `key`.
///
/// Returns `Ok(None)` when nothing has been stored yet.
pub fn load_state<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = storage.load(key)? else {
        return Ok(None);
    };

    let envelope: PersistedState<T> = serde_json::from_str(&raw)?;
    if envelope.version > PERSISTED_STATE_VERSION {
        return Err(StoreError::UnsupportedVersion {
            key: key.to_string(),
            found: envelope.version,
            supported: PERSISTED_STATE_VERSION,
        });
    }

    Ok(Some(envelope.state))
}

/// Encode `state` at the current version and write it under `key`.
pub fn save_state<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, state: &T) -> Result<()> {
    let envelope = PersistedState {
        version: PERSISTED_STATE_VERSION,
        state,
    };
    let json = serde_json::to_string(&envelope)?;
    storage.save(key, &json)
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// [`KeyValueStorage`] backed by the `kv_entries` table.
pub struct SqliteStorage {
    db: Mutex<Database>,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl KeyValueStorage for SqliteStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.get_entry(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.put_entry(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.delete_entry(key)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Process-local [`KeyValueStorage`]; contents are lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
