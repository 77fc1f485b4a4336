//! # tourdesk-store
//!
//! Local durable key-value storage for the Tourdesk client.
//!
//! Client stores persist their state as JSON documents under a fixed key.
//! The crate exposes the [`KeyValueStorage`] trait those stores depend on,
//! a SQLite-backed implementation ([`SqliteStorage`], wrapping a
//! [`Database`]) and an in-memory one ([`MemoryStorage`]) for tests and
//! ephemeral sessions.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod storage;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use storage::{load_state, save_state, KeyValueStorage, MemoryStorage, PersistedState, SqliteStorage};
