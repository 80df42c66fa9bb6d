//! webroot-bridge - serve a privileged directory to a web renderer
//!
//! This crate provides:
//! - Content-type resolution for requested file names
//! - Privileged channels that open files the process itself cannot read
//! - The file bridge confining every request to one canonical directory
//! - A localhost asset server putting the bridge behind a session token
//! - Layered configuration and structured logging with rotation

pub mod asset;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod core;
pub mod logging;
pub mod mime;

// Re-export commonly used items
pub use crate::core::error::{Result, WebRootError};
pub use asset::{AssetServerConfig, WebRootServer};
pub use bridge::{
    ConstructionError, ModuleError, ModuleWebRoot, PrivilegedFileBridge, ResponseEnvelope,
};
pub use channel::{connect, ChannelConfig, ChannelError, PrivilegedChannel};
pub use config::{BridgeConfig, ConfigLoader};
pub use logging::{LoggingConfig, LoggingSystem};
pub use mime::MimeResolver;
