//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BREWLINE_PORT=9000                                                 │
//! │     BREWLINE_ORDER_HASH_SECRET=...                                     │
//! │                                                                         │
//! │  2. TOML Config File (path in BREWLINE_CONFIG)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! database_path = "/var/lib/brewline/brewline.db"
//! max_connections = 8
//! order_hash_secret = "..."
//! allow_negative_stock = true
//! ```

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use brewline_core::{OrderFingerprint, StockPolicy};
use brewline_db::DbConfig;

/// Used when no secret is configured. Hashes made with it prove nothing.
const DEV_ORDER_HASH_SECRET: &str = "brewline-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Key for order transaction hashes
    pub order_hash_secret: Option<String>,

    /// Whether sales may take stock below zero (recorded, never blocked)
    pub allow_negative_stock: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: PathBuf::from("./brewline.db"),
            max_connections: 5,
            order_hash_secret: None,
            allow_negative_stock: true,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file named by `BREWLINE_CONFIG`
    /// 3. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("BREWLINE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Reads a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading server config from file");
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies `BREWLINE_*` overrides read through `lookup`.
    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BREWLINE_HOST") {
            self.host = host;
        }

        if let Some(port) = lookup("BREWLINE_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BREWLINE_PORT".to_string()))?;
        }

        if let Some(path) = lookup("BREWLINE_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Some(max) = lookup("BREWLINE_MAX_CONNECTIONS") {
            self.max_connections = max
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BREWLINE_MAX_CONNECTIONS".to_string()))?;
        }

        if let Some(secret) = lookup("BREWLINE_ORDER_HASH_SECRET") {
            self.order_hash_secret = Some(secret);
        }

        if let Some(allow) = lookup("BREWLINE_ALLOW_NEGATIVE_STOCK") {
            self.allow_negative_stock = allow.parse().map_err(|_| {
                ConfigError::InvalidValue("BREWLINE_ALLOW_NEGATIVE_STOCK".to_string())
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.order_hash_secret.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue("order_hash_secret".to_string()));
        }
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn stock_policy(&self) -> StockPolicy {
        StockPolicy {
            allow_negative_stock: self.allow_negative_stock,
        }
    }

    /// Builds the order hasher, falling back to the development secret.
    pub fn fingerprint(&self) -> Result<OrderFingerprint, ConfigError> {
        let secret = match &self.order_hash_secret {
            Some(secret) => secret.as_str(),
            None => {
                warn!("BREWLINE_ORDER_HASH_SECRET not set, using the development secret");
                DEV_ORDER_HASH_SECRET
            }
        };
        OrderFingerprint::new(secret)
            .map_err(|_| ConfigError::InvalidValue("order_hash_secret".to_string()))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Cannot read config file {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config file: {0}")]
    Parse(String),
}
