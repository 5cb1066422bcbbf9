//! CLI configuration loading.
//!
//! Configuration can come from:
//! - A TOML file ($WAVELINK_CONFIG or well-known paths)
//! - Environment variables (WAVELINK_*)
//! - Command line arguments (future)

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wavelink_core::{ClientConfig, ReconnectPolicy};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP(S) base URL of the realtime server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Channel namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Credential for the channel and the history API.
    #[serde(default = "default_token")]
    pub token: Option<String>,

    /// Base URL of the history API; defaults to the server URL.
    #[serde(default)]
    pub history_url: Option<String>,

    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_server_url() -> String {
    std::env::var("WAVELINK_URL").unwrap_or_else(|_| "http://127.0.0.1:4000".to_string())
}

fn default_namespace() -> String {
    std::env::var("WAVELINK_NAMESPACE").unwrap_or_else(|_| "/chat".to_string())
}

fn default_token() -> Option<String> {
    std::env::var("WAVELINK_TOKEN").ok()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            namespace: default_namespace(),
            token: default_token(),
            history_url: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("WAVELINK_CONFIG") {
            return Self::from_file(&path);
        }

        let config_paths = [
            "wavelink.toml",
            "~/.config/wavelink/wavelink.toml",
            "/etc/wavelink/wavelink.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Core client configuration for the channel session.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server_url.clone(),
            namespace: self.namespace.clone(),
            reconnect: self.reconnect.clone(),
        }
    }

    /// Base URL for the history API.
    #[must_use]
    pub fn history_url(&self) -> &str {
        self.history_url.as_deref().unwrap_or(&self.server_url)
    }
}
