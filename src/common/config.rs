//! Configuration file handling

use serde::Deserialize;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where scenarios connect when neither the CLI nor the scenario says
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Connection settings
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Server address as `host:port`
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:5432".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for establishing the TCP connection
    #[serde(default = "default_connect")]
    pub connect_secs: u64,

    /// Deadline applied to every receive and flush on the connection
    #[serde(default = "default_io")]
    pub io_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect(),
            io_secs: default_io(),
        }
    }
}

fn default_connect() -> u64 {
    5
}
fn default_io() -> u64 {
    10
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn io(&self) -> Duration {
        Duration::from_secs(self.io_secs)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
