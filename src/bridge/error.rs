//! Bridge error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a bridge from being constructed
///
/// Per-request failures never appear here; they collapse into an empty
/// [`ResponseEnvelope`](super::ResponseEnvelope).
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("Directory '{}' is under the forbidden prefix '{prefix}'", .path.display())]
    ForbiddenDirectory { path: PathBuf, prefix: &'static str },

    #[error("Failed to resolve the canonical path for '{}': {source}", .path.display())]
    UnresolvablePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConstructionError {
    /// Check if construction failed because of a forbidden directory
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ConstructionError::ForbiddenDirectory { .. })
    }
}
