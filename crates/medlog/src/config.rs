//! Configuration management for medlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ingest::DEFAULT_DEVICE_ID;
use crate::store::{DEFAULT_ALERT_LIMIT, DEFAULT_CAPACITY, MAX_CAPACITY};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "medlog";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "MEDLOG_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MEDLOG_`, sections separated by
///    `__`, e.g. `MEDLOG_SERVER__PORT`)
/// 2. TOML config file at `~/.config/medlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Log store configuration.
    pub store: StoreConfig,
    /// Ingestion configuration.
    pub ingest: IngestConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_address: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory of dashboard assets served for non-API paths.
    pub static_dir: Option<PathBuf>,
}

/// Log store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of events retained.
    pub capacity: usize,
    /// Maximum number of alerts returned by the recent alerts endpoint.
    pub alert_limit: usize,
    /// Preload demo events at startup.
    pub seed_demo_data: bool,
}

/// Ingestion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Device identifier assigned to reports that don't carry one.
    pub default_device_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            static_dir: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            alert_limit: DEFAULT_ALERT_LIMIT,
            seed_demo_data: false,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_device_id: DEFAULT_DEVICE_ID.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(config_file))
    }

    /// Build the layered figment for a config file.
    #[must_use]
    pub fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate configuration from a figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.store.capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "store.capacity must be greater than 0".to_string(),
            });
        }

        if self.store.capacity > MAX_CAPACITY {
            return Err(Error::ConfigValidation {
                message: format!(
                    "store.capacity ({}) cannot be greater than {MAX_CAPACITY}",
                    self.store.capacity
                ),
            });
        }

        if self.store.alert_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "store.alert_limit must be greater than 0".to_string(),
            });
        }

        if self.ingest.default_device_id.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "ingest.default_device_id must not be empty".to_string(),
            });
        }

        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "server.bind_address is not an IP address: {}",
                    self.server.bind_address
                ),
            });
        }

        Ok(())
    }

    /// Get the socket address the server listens on.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!(
                    "server.bind_address is not an IP address: {}",
                    self.server.bind_address
                ),
            })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
