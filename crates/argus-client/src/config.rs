//! Client configuration.

use std::time::Duration;

/// Connection and collaborator endpoints plus reconnect tuning.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket URL of the backend event stream.
    pub ws_url: String,
    /// Base URL for the collaborator REST API.
    pub api_base: String,
    /// How long to wait for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:8000/ws".to_string(),
            api_base: "http://127.0.0.1:8000/api/".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `ARGUS_WS_URL` and `ARGUS_API_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ARGUS_WS_URL") {
            config.ws_url = url;
        }
        if let Ok(url) = std::env::var("ARGUS_API_URL") {
            config.api_base = url;
        }
        config
    }
}
