//! Renderer Asset Server
//!
//! Localhost HTTP front for the privileged file bridge. The renderer issues
//! `GET /<relative-path>`; a served envelope becomes `200` with its content
//! type and a streamed body, an empty envelope becomes `404` with no body.
//!
//! Security features:
//! - Session token validation (query parameter, header or session cookie)
//! - Security response headers (X-Content-Type-Options, X-Frame-Options)
//! - Localhost-only binding
//! - GET only

mod error;
mod insets;
mod routes;
mod server;
#[cfg(test)]
mod tests;

pub use error::AssetError;
pub use insets::{Insets, InsetsState, INSETS_PATH};
pub use routes::{
    security_middleware, serve_path, serve_root, SESSION_COOKIE, TOKEN_HEADER, TOKEN_PARAM,
};
pub use server::{AssetServerConfig, AssetServerState, WebRootServer, DEFAULT_ASSET_SERVER_PORT};
