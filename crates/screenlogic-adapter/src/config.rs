//! Configuration types for the adapter and the `screenlogic` CLI.
//! Parsed from ~/.screenlogic/config.toml.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use screenlogic_protocol::DEFAULT_MAX_RETRIES;

use crate::error::{Error, Result};

/// Default TCP port of the controller's local protocol server.
pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Controller address, `host` or `host:port`.
    #[serde(default)]
    pub ip_address: String,
    #[serde(default = "default_5")]
    pub timeout_secs: u64,
    #[serde(default = "default_60")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Require response ids to echo request ids. When false, a response is
    /// matched on code alone.
    #[serde(default = "default_true")]
    pub match_response_ids: bool,
    #[serde(default = "default_60")]
    pub close_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSection {
    /// EnvFilter directive, overridden by RUST_LOG.
    pub filter: Option<String>,
    #[serde(default)]
    pub json: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ip_address: String::new(),
            timeout_secs: 5,
            keep_alive_secs: 60,
            max_retries: DEFAULT_MAX_RETRIES,
            match_response_ids: true,
            close_grace_secs: 60,
        }
    }
}

fn default_5() -> u64 {
    5
}
fn default_60() -> u64 {
    60
}
fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}
fn default_true() -> bool {
    true
}

/// Runtime knobs for sessions and the connection manager.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Per dial/send/read deadline.
    pub timeout: Duration,
    /// Idle time after which the connection is closed.
    pub keep_alive: Duration,
    pub max_retries: usize,
    pub match_response_ids: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        AdapterConfig::default().options()
    }
}

impl AdapterConfig {
    pub fn options(&self) -> AdapterOptions {
        AdapterOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            max_retries: self.max_retries.max(1),
            match_response_ids: self.match_response_ids,
        }
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_secs(self.close_grace_secs)
    }

    /// The dial address, with the default port added when none is given.
    pub fn socket_addr(&self) -> Result<String> {
        let ip = self.ip_address.trim();
        if ip.is_empty() {
            return Err(Error::Config("ip_address is not set".into()));
        }
        if ip.parse::<std::net::SocketAddr>().is_ok() {
            return Ok(ip.to_string());
        }
        if ip.parse::<std::net::Ipv6Addr>().is_ok() {
            return Ok(format!("[{ip}]:{DEFAULT_PORT}"));
        }
        match ip.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => Ok(ip.to_string()),
            _ => Ok(format!("{ip}:{DEFAULT_PORT}")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".into()));
        }
        if self.keep_alive_secs == 0 {
            return Err(Error::Config("keep_alive_secs must be positive".into()));
        }
        Ok(())
    }
}

impl Config {
    /// Load config from file, or use defaults if missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("parse {}: {e}", path.display())))
        } else {
            Ok(Self::default())
        }
    }
}

/// Expand ~ to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
