// Application configuration
// Logging is on by default only in debug builds

use crate::error::{Error, Result};
use crate::peer::types::ServerConfig;
use crate::utils::add_ice_url_scheme;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use webrtc::ice_transport::ice_server::RTCIceServer;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true;

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false;

pub const DEFAULT_CHANNEL_LABEL: &str = "chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ice_servers: Vec<ServerConfig>,
    /// Label of the data channel the hosting side opens
    pub channel_label: String,
    /// Gzip payload JSON before base64 (shorter blobs)
    pub compress_payloads: bool,
    /// Give up waiting for ICE gathering after this many seconds; wait
    /// forever when unset
    pub gather_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            channel_label: DEFAULT_CHANNEL_LABEL.to_string(),
            compress_payloads: false,
            gather_timeout_secs: None,
        }
    }
}

pub fn default_ice_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig {
            id: "default-stun".into(),
            r#type: "stun".into(),
            url: "stun:stun.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
        ServerConfig {
            id: "default-stun-1".into(),
            r#type: "stun".into(),
            url: "stun:stun1.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
    ]
}

impl Config {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(Error::Config(format!(
                    "ICE server '{}' has an empty URL",
                    server.id
                )));
            }

            if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none())
            {
                return Err(Error::Config(format!(
                    "TURN server '{}' ({}) requires username and credential",
                    server.id, server.url
                )));
            }
        }

        if self.channel_label.is_empty() {
            return Err(Error::Config("channel label cannot be empty".into()));
        }

        if self.gather_timeout_secs == Some(0) {
            return Err(Error::Config("gather timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub fn gather_timeout(&self) -> Option<Duration> {
        self.gather_timeout_secs.map(Duration::from_secs)
    }

    pub fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|config| {
                let url = add_ice_url_scheme(config);
                debug!("ICE server {}: {}", config.id, url);
                RTCIceServer {
                    urls: vec![url],
                    username: config.username.clone().unwrap_or_default(),
                    credential: config.credential.clone().unwrap_or_default(),
                }
            })
            .collect()
    }
}
