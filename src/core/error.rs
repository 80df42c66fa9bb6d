//! Error types for the webroot bridge
//!
//! Each module owns its error enum; [`WebRootError`] gathers them for callers
//! that drive the whole process.

use thiserror::Error;

use crate::asset::AssetError;
use crate::bridge::{ConstructionError, ModuleError};
use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, WebRootError>;

/// Main error type for the webroot bridge
#[derive(Error, Debug)]
pub enum WebRootError {
    #[error("Bridge construction failed: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Module cannot be served: {0}")]
    Module(#[from] ModuleError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Asset server error: {0}")]
    Asset(#[from] AssetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebRootError {
    /// Process exit status for this error, following `sysexits.h`
    pub fn exit_code(&self) -> i32 {
        match self {
            WebRootError::Config(_) => 78, // EX_CONFIG
            WebRootError::Construction(e) if e.is_forbidden() => 77, // EX_NOPERM
            WebRootError::Construction(_) => 66, // EX_NOINPUT
            WebRootError::Module(ModuleError::InvalidId(_)) => 64, // EX_USAGE
            WebRootError::Module(ModuleError::NoWebUi { .. }) => 66, // EX_NOINPUT
            WebRootError::Module(_) => 69, // EX_UNAVAILABLE
            WebRootError::Channel(_) | WebRootError::Asset(AssetError::BindFailed { .. }) => 69, // EX_UNAVAILABLE
            WebRootError::Logging(_) | WebRootError::Io(_) => 74, // EX_IOERR
            WebRootError::Asset(_) => 70, // EX_SOFTWARE
        }
    }
}
