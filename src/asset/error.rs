//! Asset server error types

use thiserror::Error;

/// Asset server error type
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Invalid session token")]
    InvalidToken,

    #[error("Server bind failed: {reason}")]
    BindFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {reason}")]
    Internal { reason: String },
}

impl AssetError {
    /// Check if this error should result in a 403 Forbidden response
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AssetError::InvalidToken)
    }
}

impl axum::response::IntoResponse for AssetError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = if self.is_forbidden() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        status.into_response()
    }
}
