//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client can start against a local
//! mock backend with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use tourdesk_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_PAGE_SIZE, DELIVERED_DELAY_MS, READ_DELAY_MS,
};

/// Delays of the simulated delivery/read receipts, measured from the send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptDelays {
    pub delivered: Duration,
    pub read: Duration,
}

impl Default for ReceiptDelays {
    fn default() -> Self {
        Self {
            delivered: Duration::from_millis(DELIVERED_DELAY_MS),
            read: Duration::from_millis(READ_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API (chat and notification services).
    /// Env: `TOURDESK_API_URL`
    /// Default: `http://127.0.0.1:8080/api`
    pub api_base_url: String,

    /// Bearer token sent with every request.
    /// Env: `TOURDESK_AUTH_TOKEN`
    /// Default: none.
    pub auth_token: Option<String>,

    /// Directory holding `tourdesk.db`.
    /// Env: `TOURDESK_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Env: `TOURDESK_DELIVERED_DELAY_MS` / `TOURDESK_READ_DELAY_MS`
    pub receipt_delays: ReceiptDelays,

    /// Notifications fetched per page.
    /// Env: `TOURDESK_PAGE_SIZE`
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}/api"),
            auth_token: None,
            data_dir: None,
            receipt_delays: ReceiptDelays::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("TOURDESK_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(token) = lookup("TOURDESK_AUTH_TOKEN") {
            if !token.is_empty() {
                config.auth_token = Some(token);
            }
        }

        if let Some(dir) = lookup("TOURDESK_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "TOURDESK_DELIVERED_DELAY_MS") {
            config.receipt_delays.delivered = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "TOURDESK_READ_DELAY_MS") {
            config.receipt_delays.read = Duration::from_millis(ms);
        }

        if config.receipt_delays.read < config.receipt_delays.delivered {
            tracing::warn!(
                delivered_ms = config.receipt_delays.delivered.as_millis() as u64,
                read_ms = config.receipt_delays.read.as_millis() as u64,
                "Read receipt delay shorter than delivery delay, using defaults"
            );
            config.receipt_delays = ReceiptDelays::default();
        }

        if let Some(size) = parse_var::<u32>(&lookup, "TOURDESK_PAGE_SIZE") {
            if size > 0 {
                config.page_size = size;
            }
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = from_pairs(&[]);
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.receipt_delays, ReceiptDelays::default());
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("TOURDESK_API_URL", "https://backoffice.example.com/api/"),
            ("TOURDESK_AUTH_TOKEN", "secret"),
            ("TOURDESK_DELIVERED_DELAY_MS", "10"),
            ("TOURDESK_READ_DELAY_MS", "20"),
            ("TOURDESK_PAGE_SIZE", "50"),
        ]);
        assert_eq!(config.api_base_url, "https://backoffice.example.com/api");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.receipt_delays.delivered, Duration::from_millis(10));
        assert_eq!(config.receipt_delays.read, Duration::from_millis(20));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("TOURDESK_PAGE_SIZE", "lots"),
            ("TOURDESK_DELIVERED_DELAY_MS", "500"),
            ("TOURDESK_READ_DELAY_MS", "100"),
        ]);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.receipt_delays, ReceiptDelays::default());
    }
}
