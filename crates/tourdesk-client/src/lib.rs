pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod platform;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod stores;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use error::{ClientError, Result};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("tourdesk_client=debug,tourdesk_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
