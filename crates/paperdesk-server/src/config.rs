//! Server configuration.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Environment variable naming the config file path.
pub const CONFIG_ENV: &str = "PAPERDESK_CONFIG";

/// Paper trading server configuration.
///
/// Every field has a default so an empty TOML file (or no file at all)
/// yields a runnable synthetic-only server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upstream provider base URL (empty = market crate default).
    #[serde(default)]
    pub upstream_base_url: String,
    /// Upstream provider API token (empty = synthetic quotes only).
    #[serde(default)]
    pub upstream_token: String,
    /// Quote cache TTL in seconds.
    #[serde(default = "default_quote_ttl_secs")]
    pub quote_ttl_secs: u64,
    /// Maximum concurrent WebSocket feed connections.
    #[serde(default = "default_max_ws_connections")]
    pub max_ws_connections: usize,
    /// Quote feed push interval in milliseconds.
    #[serde(default = "default_quote_interval_ms")]
    pub quote_interval_ms: u64,
    /// Order book feed push interval in milliseconds.
    #[serde(default = "default_orderbook_interval_ms")]
    pub orderbook_interval_ms: u64,
    /// Ticker tape push interval in milliseconds.
    #[serde(default = "default_tickers_interval_ms")]
    pub tickers_interval_ms: u64,
    /// Number of symbols drawn into the shortable universe at startup.
    #[serde(default = "default_shortable_count")]
    pub shortable_count: usize,
    /// Allow `PUT /auth/upgrade-tier` (demo-only escape hatch).
    #[serde(default = "default_allow_tier_upgrade")]
    pub allow_tier_upgrade: bool,
    /// Allowed CORS origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_quote_ttl_secs() -> u64 {
    5
}

fn default_max_ws_connections() -> usize {
    64
}

fn default_quote_interval_ms() -> u64 {
    1000
}

fn default_orderbook_interval_ms() -> u64 {
    500
}

fn default_tickers_interval_ms() -> u64 {
    1000
}

fn default_shortable_count() -> usize {
    8
}

fn default_allow_tier_upgrade() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_base_url: String::new(),
            upstream_token: String::new(),
            quote_ttl_secs: default_quote_ttl_secs(),
            max_ws_connections: default_max_ws_connections(),
            quote_interval_ms: default_quote_interval_ms(),
            orderbook_interval_ms: default_orderbook_interval_ms(),
            tickers_interval_ms: default_tickers_interval_ms(),
            shortable_count: default_shortable_count(),
            allow_tier_upgrade: default_allow_tier_upgrade(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file '{path}': {e}")))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file '{path}': {e}")))?;
        Ok(config)
    }

    /// True when an upstream provider token is configured.
    pub fn upstream_enabled(&self) -> bool {
        !self.upstream_token.is_empty()
    }
}
