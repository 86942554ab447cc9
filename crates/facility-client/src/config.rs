//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/facility/config.toml` by default. Command-line flags override
//! the values read from it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use facility_server::{DEFAULT_PORT, ServerConfig};

use crate::invoker::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT};

/// Configuration for the facility client and the server it can launch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug logging, same as `--debug`.
    pub debug: bool,

    /// Where requests are sent and how they are retried.
    pub server: ServerSettings,

    /// Settings for `facility server`.
    pub daemon: DaemonSettings,
}

/// Remote server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,

    /// Seconds to wait for a reply before resending.
    pub timeout: u64,

    /// Sends per request, the first one included.
    pub max_attempts: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Replaces each setting given on the command line.
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
        timeout: Option<u64>,
        max_attempts: Option<u32>,
    ) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        if let Some(max_attempts) = max_attempts {
            self.max_attempts = max_attempts;
        }
    }
}

/// Local server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub bind: IpAddr,
    pub port: u16,

    /// Seconds allowed for one update delivery.
    pub notify_timeout: u64,

    /// Seconds a reply stays cached for retried requests.
    pub reply_ttl: u64,

    /// Maximum number of cached replies.
    pub reply_capacity: usize,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: defaults.bind_addr.ip(),
            port: defaults.bind_addr.port(),
            notify_timeout: defaults.notify_timeout.as_secs(),
            reply_ttl: defaults.reply_ttl.as_secs(),
            reply_capacity: defaults.reply_capacity,
        }
    }
}

impl DaemonSettings {
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::new(SocketAddr::new(self.bind, self.port))
            .with_notify_timeout(Duration::from_secs(self.notify_timeout))
            .with_reply_ttl(Duration::from_secs(self.reply_ttl))
            .with_reply_capacity(self.reply_capacity)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Rejects values no request could succeed with.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.trim().is_empty() {
            return Err("server.host must not be empty".into());
        }
        if self.server.port == 0 {
            return Err("server.port must not be 0".into());
        }
        if self.server.timeout == 0 {
            return Err("server.timeout must be at least 1 second".into());
        }
        if self.server.max_attempts == 0 {
            return Err("server.max_attempts must be at least 1".into());
        }
        if self.daemon.reply_capacity == 0 {
            return Err("daemon.reply_capacity must be at least 1".into());
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("facility")
    }
}
