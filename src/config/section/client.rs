//! `[client]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [client]
//! url = "ws://127.0.0.1:8090"
//! reconnect_delay_ms = 500
//! request_timeout_ms = 10000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Editor client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server endpoint.
    pub url: String,

    /// Delay before the single reconnection attempt after an unclean close.
    pub reconnect_delay_ms: u64,

    /// Outstanding requests are rejected after this long.
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8090".to_string(),
            reconnect_delay_ms: 500,
            request_timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_client_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.client.reconnect_delay(), Duration::from_millis(500));
        assert_eq!(config.client.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_client_override() {
        let config = test_parse_config("[client]\nurl = \"ws://10.0.0.2:9000\"");
        assert_eq!(config.client.url, "ws://10.0.0.2:9000");
    }
}
