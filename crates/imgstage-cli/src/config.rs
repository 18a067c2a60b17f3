//! CLI configuration file (TOML).
//!
//! A missing file means defaults: a local store under `./imgstage-data`, RPC
//! on `127.0.0.1:8080/rpc`, cleanup every 5 minutes with a 15 minute TTL.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use imgstage_core::{SavePolicy, StoreConfig};
use serde::Deserialize;

/// Store root used when the config names none.
pub const DEFAULT_DATA_DIR: &str = "imgstage-data";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_store")]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("server.path must start with '/', got {0:?}")]
    BadPath(String),

    #[error("`{0}` needs a persistent store; set store.root or use a remote backend")]
    EphemeralStore(&'static str),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: default_store(),
            server: ServerConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

fn default_store() -> StoreConfig {
    StoreConfig::Local {
        root: Some(DEFAULT_DATA_DIR.into()),
        save_policy: SavePolicy::default(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        if !config.server.path.starts_with('/') {
            return Err(ConfigError::BadPath(config.server.path));
        }
        Ok(config)
    }

    /// The store for a one-shot command. An in-memory store would be gone
    /// before the next command runs, so it is refused.
    pub fn persistent_store(&self, command: &'static str) -> Result<&StoreConfig, ConfigError> {
        if self.store.is_in_memory() {
            return Err(ConfigError::EphemeralStore(command));
        }
        Ok(&self.store)
    }
}

// -----------------------------------------------------------------------------
// ServerConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route of the JSON-RPC endpoint.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/rpc".to_string()
}

// -----------------------------------------------------------------------------
// CleanupConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CleanupConfig {
    /// Seconds between sweeps while serving. 0 disables the scheduler.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Staged images older than this are removed.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CleanupConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    5 * 60
}

fn default_ttl_secs() -> u64 {
    15 * 60
}
