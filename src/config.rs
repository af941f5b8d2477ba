//! Configuration management for Floodgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the Floodgate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Quota configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Paths that bypass rate limiting entirely
    #[serde(default)]
    pub exempt: ExemptConfig,

    /// Counter storage backend
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for FloodgateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            exempt: ExemptConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Quota configuration: one rule, parameterized by limit and window length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests allowed per client within one window
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Whether a rejected request still increments the window counter.
    /// Off by default so turned-away traffic does not consume quota.
    #[serde(default)]
    pub count_rejected: bool,

    /// Header carrying the client address, set by a trusted proxy.
    /// The value is used verbatim as the rate-limit identity.
    #[serde(default = "default_client_header")]
    pub client_header: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_secs: default_window_secs(),
            count_rejected: false,
            client_header: default_client_header(),
        }
    }
}

fn default_limit() -> u32 {
    50
}

fn default_window_secs() -> u64 {
    3600
}

fn default_client_header() -> String {
    "x-forwarded-for".to_string()
}

/// Static-asset paths that are never rate limited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemptConfig {
    /// Path prefixes to skip (e.g. asset directories)
    #[serde(default = "default_path_prefixes")]
    pub path_prefixes: Vec<String>,

    /// Path suffixes to skip (file extensions)
    #[serde(default = "default_path_suffixes")]
    pub path_suffixes: Vec<String>,
}

impl Default for ExemptConfig {
    fn default() -> Self {
        Self {
            path_prefixes: default_path_prefixes(),
            path_suffixes: default_path_suffixes(),
        }
    }
}

fn default_path_prefixes() -> Vec<String> {
    vec!["/assets/".to_string(), "/_next/".to_string()]
}

fn default_path_suffixes() -> Vec<String> {
    vec![
        ".png".to_string(),
        ".js".to_string(),
        ".css".to_string(),
        ".ico".to_string(),
    ]
}

/// Counter storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process counters; quotas reset on restart.
    Memory {
        /// Entry-count ceiling that triggers a sweep of expired counters
        #[serde(default = "default_max_entries")]
        max_entries: usize,
    },
    /// Redis-backed counters with native key expiry; shared across
    /// serving instances.
    Redis {
        /// Redis connection URL
        url: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    500
}

impl FloodgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: FloodgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::FloodgateError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Reject configurations the limiter cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.rate_limit.limit == 0 {
            return Err(crate::error::FloodgateError::Config(
                "rate_limit.limit must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(crate::error::FloodgateError::Config(
                "rate_limit.window_secs must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.client_header.is_empty() {
            return Err(crate::error::FloodgateError::Config(
                "rate_limit.client_header must not be empty".to_string(),
            ));
        }
        if let StoreConfig::Memory { max_entries } = self.store {
            if max_entries == 0 {
                return Err(crate::error::FloodgateError::Config(
                    "store.max_entries must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
