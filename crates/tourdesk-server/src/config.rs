//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the mock backend starts with zero
//! configuration for local development.

use std::net::SocketAddr;

use tourdesk_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address of the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Name reported by `/info`.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Tourdesk Mock Backend"`
    pub instance_name: String,

    /// Load demo users, conversations and notifications at startup.
    /// Env: `SEED_DEMO` (true/false)
    /// Default: `true`
    pub seed_demo: bool,

    /// Notification page size when the query has none.
    /// Env: `DEFAULT_PAGE_SIZE`
    pub default_page_size: u32,

    /// Upper bound for a requested page size.
    /// Env: `MAX_PAGE_SIZE`
    /// Default: `100`
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            instance_name: "Tourdesk Mock Backend".to_string(),
            seed_demo: true,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("SEED_DEMO") {
            config.seed_demo = val != "false" && val != "0";
        }

        if let Some(val) = lookup("DEFAULT_PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.default_page_size = n,
                _ => tracing::warn!(value = %val, "Invalid DEFAULT_PAGE_SIZE, using default"),
            }
        }

        if let Some(val) = lookup("MAX_PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.max_page_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_PAGE_SIZE, using default"),
            }
        }

        if config.default_page_size > config.max_page_size {
            config.default_page_size = config.max_page_size;
        }

        config
    }

    /// Page size to use for a request asking for `requested`.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}
