//! Configuration Management Module for the webroot bridge
//!
//! Provides layered configuration with:
//! - Compiled-in defaults
//! - An optional TOML/JSON/YAML file
//! - `WEBROOT__*` environment overrides (`WEBROOT__SERVER__PORT=8080`)
//! - Validation before anything is started

mod loader;

pub use loader::{default_config_path, ConfigLoader, ENV_PREFIX};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetServerConfig;
use crate::channel::{ChannelConfig, ChannelKind};
use crate::logging::LoggingConfig;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory exposed to the renderer
    pub base_directory: PathBuf,

    /// How files are opened
    pub channel: ChannelConfig,

    /// Localhost asset server
    pub server: AssetServerConfig,

    /// Logging setup
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Configuration exposing `base_directory` with defaults for the rest
    pub fn for_directory(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            ..Default::default()
        }
    }

    /// Check the configuration before anything is started
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "base_directory must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Invalid(
                "server.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.channel.kind == ChannelKind::Su && self.channel.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "channel.program must name an elevation program".to_string(),
            ));
        }

        Ok(())
    }

    /// Pretty JSON rendering of the effective configuration
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
