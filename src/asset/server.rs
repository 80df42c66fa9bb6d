//! Renderer asset server implementation
//!
//! Provides a localhost HTTP server streaming bridge responses with:
//! - Session token validation
//! - Security headers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{body::Body, http::Request, middleware, routing::get, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::error::AssetError;
use super::insets::{Insets, InsetsState};
use super::routes::{security_middleware, serve_path, serve_root};
use crate::bridge::PrivilegedFileBridge;

/// Default port for the asset server
pub const DEFAULT_ASSET_SERVER_PORT: u16 = 19283;

/// Asset server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetServerConfig {
    /// Port to bind to (localhost only)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Require the session token on every request
    #[serde(default = "default_true")]
    pub require_token: bool,

    /// Window insets served until the host replaces them
    #[serde(default)]
    pub insets: Insets,
}

fn default_port() -> u16 {
    DEFAULT_ASSET_SERVER_PORT
}

fn default_true() -> bool {
    true
}

impl Default for AssetServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_ASSET_SERVER_PORT,
            require_token: true,
            insets: Insets::default(),
        }
    }
}

impl AssetServerConfig {
    /// Create a new configuration with a custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }
}

/// Shared state for the asset server
#[derive(Clone)]
pub struct AssetServerState {
    /// Bridge answering path requests
    pub bridge: Arc<PrivilegedFileBridge>,
    /// Session token (generated at startup)
    pub session_token: String,
    /// Insets served at the reserved stylesheet path
    pub insets: Arc<InsetsState>,
    /// Configuration
    pub config: AssetServerConfig,
}

impl AssetServerState {
    /// Create a new server state with the given configuration
    pub fn new(bridge: Arc<PrivilegedFileBridge>, config: AssetServerConfig) -> Self {
        Self {
            bridge,
            session_token: Self::generate_session_token(),
            insets: Arc::new(InsetsState::new(config.insets)),
            config,
        }
    }

    /// Generate a cryptographically secure session token
    fn generate_session_token() -> String {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bytes: [u8; 32] = rng.gen();
        hex::encode(bytes)
    }

    /// Validate a session token
    pub fn validate_token(&self, token: &str) -> bool {
        // Constant-time comparison to prevent timing attacks
        self.session_token.len() == token.len()
            && self
                .session_token
                .as_bytes()
                .iter()
                .zip(token.as_bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// Asset server exposing one bridge to the renderer
pub struct WebRootServer {
    /// Server state (shared with handlers)
    state: AssetServerState,
}

impl WebRootServer {
    /// Create a new server for `bridge`
    pub fn new(bridge: Arc<PrivilegedFileBridge>, config: AssetServerConfig) -> Self {
        Self {
            state: AssetServerState::new(bridge, config),
        }
    }

    /// Get the session token (for the renderer to use in requests)
    pub fn get_session_token(&self) -> &str {
        &self.state.session_token
    }

    /// Get the server port
    pub fn port(&self) -> u16 {
        self.state.config.port
    }

    /// Get a reference to the server state
    pub fn state(&self) -> &AssetServerState {
        &self.state
    }

    /// Shared insets, for an embedding host to update
    pub fn insets(&self) -> Arc<InsetsState> {
        Arc::clone(&self.state.insets)
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        let state = self.state.clone();

        Router::new()
            .route("/", get(serve_root))
            .route("/*path", get(serve_path))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                security_middleware,
            ))
            .layer(
                // Path only: the query string may carry the session token
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::debug_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
            )
            .with_state(state)
    }

    /// URL the renderer should load first; it carries the session token
    pub fn entry_url(&self, path: &str) -> String {
        format!(
            "http://127.0.0.1:{}/{}?token={}",
            self.state.config.port,
            path.trim_start_matches('/'),
            self.state.session_token
        )
    }

    /// Start the server (blocking)
    pub async fn start(&self) -> Result<(), AssetError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.state.config.port));
        let router = self.build_router();

        tracing::info!(
            "Webroot server listening on {} for {} with token {}...",
            addr,
            self.state.bridge.directory(),
            &self.state.session_token[..8]
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AssetError::BindFailed {
                reason: e.to_string(),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| AssetError::Internal {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    /// Start the server in a background task
    pub fn start_background(self) -> tokio::task::JoinHandle<Result<(), AssetError>> {
        tokio::spawn(async move { self.start().await })
    }
}
