//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default capacity of the actor command queue
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Default number of levels printed by the binary
pub const DEFAULT_DEPTH: u32 = 10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Order book service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Instrument label used in logs and metrics
    pub symbol: String,
    /// Capacity of the actor command queue
    pub command_buffer: usize,
    /// Depth used when a query does not specify one
    pub default_depth: u32,
    /// Default tracing directive, overridden by `RUST_LOG`
    pub log_directive: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            symbol: "UNKNOWN".to_string(),
            command_buffer: DEFAULT_CHANNEL_SIZE,
            default_depth: DEFAULT_DEPTH,
            log_directive: "orderbook_store=info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON document
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "command_buffer",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.default_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "default_depth",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
