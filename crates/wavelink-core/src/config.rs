//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wavelink_transport::Endpoint;

/// Reconnect policy: fixed delay between attempts, capped attempt count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,

    /// Attempts before the session goes terminally disconnected.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl ReconnectPolicy {
    /// Delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Configuration for the realtime client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// HTTP(S) base URL of the server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Channel namespace for chat traffic.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            namespace: default_namespace(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Endpoint for the configured server, with the credential attached.
    #[must_use]
    pub fn endpoint(&self, credential: Option<&str>) -> Endpoint {
        let endpoint = Endpoint::new(self.base_url.as_str(), self.namespace.as_str());
        match credential {
            Some(token) => endpoint.with_credential(token),
            None => endpoint,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_namespace() -> String {
    "/chat".to_string()
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    5
}
