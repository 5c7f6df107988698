//! Client configuration.

/// Default API origin when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the API origin.
pub const BASE_URL_ENV: &str = "PAPERDESK_API_BASE_URL";

/// Where the client points its REST and WebSocket requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `http://127.0.0.1:8000`. No trailing slash.
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve from the environment, falling back to the default origin.
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::new(DEFAULT_BASE_URL),
        }
    }

    /// WebSocket origin derived from the API origin (`http` becomes
    /// `ws`, `https` becomes `wss`). Feed channels append their own
    /// route to this.
    pub fn ws_base_url(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
