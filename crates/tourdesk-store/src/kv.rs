//! CRUD operations on the `kv_entries` table.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Fetch the raw value stored under `key`.
    pub fn get_entry(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value stored under `key`.
    pub fn put_entry(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Remove `key`. Returns whether a row was deleted.
    pub fn delete_entry(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    pub fn list_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT key FROM kv_entries ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_overwrite_delete() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.get_entry("chat-storage").unwrap(), None);

        db.put_entry("chat-storage", "{\"a\":1}").unwrap();
        db.put_entry("chat-storage", "{\"a\":2}").unwrap();
        assert_eq!(
            db.get_entry("chat-storage").unwrap().as_deref(),
            Some("{\"a\":2}")
        );
        assert_eq!(db.list_keys().unwrap(), vec!["chat-storage".to_string()]);

        assert!(db.delete_entry("chat-storage").unwrap());
        assert!(!db.delete_entry("chat-storage").unwrap());
        assert!(db.list_keys().unwrap().is_empty());
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.put_entry("notification-storage", "{}").unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(
            db.get_entry("notification-storage").unwrap().as_deref(),
            Some("{}")
        );
    }
}
