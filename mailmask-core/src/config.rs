// mailmask-core/src/config.rs
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address the HTTP API listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Domain appended to generated masked addresses
    #[serde(default = "default_mask_domain")]
    pub mask_domain: String,
    /// SQLite database file holding the mappings
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Seconds between expiry sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Mail-transport handoff endpoint. Unset means inbound mail is
    /// logged instead of delivered.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token for the handoff endpoint
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Per-handoff timeout in seconds
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bearer_token: None,
            timeout_secs: default_relay_timeout_secs(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    // Loopback by default; the inbound route trusts its caller.
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_mask_domain() -> String {
    "mask.example.com".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("mailmask.db")
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_relay_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            mask_domain: default_mask_domain(),
            database_path: default_database_path(),
            sweep_interval_secs: default_sweep_interval_secs(),
            relay: RelayConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults so a bare
    /// `maskd run` works out of the box.
    ///
    /// Environment variables override the file: MAILMASK_BIND_ADDR,
    /// MAILMASK_MASK_DOMAIN, MAILMASK_DATABASE_PATH,
    /// MAILMASK_RELAY_ENDPOINT and MAILMASK_RELAY_TOKEN.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Ok(addr) = std::env::var("MAILMASK_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| anyhow!("MAILMASK_BIND_ADDR: {e}"))?;
        }
        if let Ok(domain) = std::env::var("MAILMASK_MASK_DOMAIN") {
            config.mask_domain = domain;
        }
        if let Ok(db) = std::env::var("MAILMASK_DATABASE_PATH") {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(endpoint) = std::env::var("MAILMASK_RELAY_ENDPOINT") {
            config.relay.endpoint = Some(endpoint);
        }
        if let Ok(token) = std::env::var("MAILMASK_RELAY_TOKEN") {
            config.relay.bearer_token = Some(token);
        }

        Ok(config)
    }

    /// Reject values that would only fail later at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.mask_domain.is_empty() || !self.mask_domain.contains('.') {
            return Err(anyhow!(
                "mask_domain must be a dotted domain name, got {:?}",
                self.mask_domain
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(anyhow!("sweep_interval_secs must be nonzero"));
        }
        if self.relay.timeout_secs == 0 {
            return Err(anyhow!("relay.timeout_secs must be nonzero"));
        }
        if let Some(endpoint) = &self.relay.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(anyhow!(
                    "relay.endpoint must be an http(s) URL, got {endpoint:?}"
                ));
            }
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.timeout_secs)
    }
}
