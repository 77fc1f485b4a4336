//! # tourdesk-shared
//!
//! Types shared by the Tourdesk client and the mock backend: identifiers,
//! chat and notification models, and the JSON shapes exchanged over REST.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::ModelError;
