//! Privileged channel error types

use thiserror::Error;

/// Privileged channel error type
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Access denied: {path} ({reason})")]
    Denied { path: String, reason: String },

    #[error("Privileged channel unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Check if the channel reported the file as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChannelError::NotFound { .. })
    }

    /// Check if the channel refused access to the file
    pub fn is_denied(&self) -> bool {
        matches!(self, ChannelError::Denied { .. })
    }
}
