//! Layered configuration loader
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Config file (explicit path, or the per-user default if it exists)
//! 3. Environment variables (`WEBROOT__*`)
//!
//! Each layer overrides the previous.

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};

use super::{BridgeConfig, ConfigError, ConfigResult};

/// Prefix of environment overrides; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "WEBROOT";

/// Per-user configuration file, `<config dir>/webroot-bridge/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("webroot-bridge").join("config.toml"))
}

/// Configuration loader with builder pattern
///
/// ```ignore
/// let config = ConfigLoader::new()
///     .with_file("/data/adb/webroot/config.toml")
///     .load()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Explicit config file; it must exist
    file: Option<PathBuf>,

    /// Environment prefix, `None` to skip environment overrides
    env_prefix: Option<String>,

    /// Skip the per-user default file
    skip_default_file: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: Some(ENV_PREFIX.to_string()),
            skip_default_file: false,
        }
    }

    /// Load from `path` instead of the per-user default
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Read overrides from `<prefix>__*` variables
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore environment variables (for testing)
    pub fn skip_env_vars(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Ignore the per-user default file
    pub fn skip_default_file(mut self) -> Self {
        self.skip_default_file = true;
        self
    }

    /// Merge all layers into a [`BridgeConfig`]
    ///
    /// The result is not validated; call [`BridgeConfig::validate`].
    pub fn load(&self) -> ConfigResult<BridgeConfig> {
        let mut builder = Config::builder();

        match &self.file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
                tracing::debug!("Loading configuration from {:?}", path);
                builder = builder.add_source(File::from(path.as_path()).required(true));
            }
            None if !self.skip_default_file => {
                if let Some(path) = default_config_path() {
                    builder = builder.add_source(File::from(path.as_path()).required(false));
                }
            }
            None => {}
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: BridgeConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Explicit file, if any
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}
