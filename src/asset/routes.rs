//! Asset server routes and middleware
//!
//! Provides the HTTP handlers forwarding renderer requests to the bridge,
//! with security middleware for token validation.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use super::error::AssetError;
use super::insets::INSETS_PATH;
use super::server::AssetServerState;
use crate::bridge::ResponseEnvelope;

/// Name of the cookie carrying the session token after the first page load
pub const SESSION_COOKIE: &str = "webroot_session";

/// Query parameter carrying the session token on the entry URL
pub const TOKEN_PARAM: &str = "token";

/// Header carrying the session token for non-browser clients
pub const TOKEN_HEADER: &str = "X-Session-Token";

/// Security middleware for token validation
///
/// This middleware:
/// 1. Accepts the request if any presented token (query parameter,
///    `X-Session-Token` header or session cookie) is the session token
/// 2. Issues the session cookie when the accepted token came from the query,
///    so the page's relative sub-resource requests authenticate
/// 3. Adds security response headers
///
/// The query is parsed by hand so a malformed or repeated parameter is an
/// ordinary token failure rather than an extractor rejection.
pub async fn security_middleware(
    State(state): State<AssetServerState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AssetError> {
    let mut issue_cookie = false;

    if state.config.require_token {
        let from_query = query_tokens(request.uri().query())
            .iter()
            .any(|t| state.validate_token(t));
        let from_header = request
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|t| state.validate_token(t));
        let from_cookie =
            session_cookie(request.headers()).is_some_and(|t| state.validate_token(t));

        if !(from_query || from_header || from_cookie) {
            tracing::warn!(
                "Invalid session token, path: {}",
                request.uri().path()
            );
            return Err(AssetError::InvalidToken);
        }
        issue_cookie = from_query;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if issue_cookie {
        let cookie = format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/",
            SESSION_COOKIE, state.session_token
        );
        let value = HeaderValue::from_str(&cookie).map_err(|e| AssetError::Internal {
            reason: e.to_string(),
        })?;
        headers.insert(header::SET_COOKIE, value);
    }

    // Prevent MIME type sniffing
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );

    // Prevent clickjacking
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    // Module files change under the renderer; always revalidate
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Ok(response)
}

/// Every decodable `token` value in a query string, in order
fn query_tokens(query: Option<&str>) -> Vec<String> {
    query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter_map(|pair| pair.split_once('='))
        .filter(|(name, _)| *name == TOKEN_PARAM)
        .filter_map(|(_, value)| percent_decode(&value.replace('+', " ")))
        .collect()
}

/// Value of the session cookie, if the request carries one
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Serve the directory root
///
/// Route: GET /
pub async fn serve_root(State(state): State<AssetServerState>) -> Response {
    envelope_response(state.bridge.handle("").await)
}

/// Serve a file relative to the exposed directory
///
/// Route: GET /*path
///
/// The path is taken from the raw URI and decoded here; a path that does not
/// decode to UTF-8 is answered like any other missing file.
pub async fn serve_path(State(state): State<AssetServerState>, uri: Uri) -> Response {
    let path = match percent_decode(uri.path().trim_start_matches('/')) {
        Some(path) => path,
        None => {
            tracing::debug!("Request path is not valid UTF-8: {}", uri.path());
            return envelope_response(ResponseEnvelope::not_found());
        }
    };

    if path == INSETS_PATH {
        let headers = [(header::CONTENT_TYPE, "text/css")];
        return (StatusCode::OK, headers, state.insets.stylesheet()).into_response();
    }

    envelope_response(state.bridge.handle(&path).await)
}

/// Decode `%XX` escapes; malformed escapes are kept as they are
///
/// Returns `None` when the decoded bytes are not UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let escaped = match bytes.get(i..i + 3) {
            Some([b'%', hi, lo]) => hex_value(*hi)
                .zip(hex_value(*lo))
                .map(|(hi, lo)| (hi << 4) | lo),
            _ => None,
        };
        match escaped {
            Some(byte) => {
                decoded.push(byte);
                i += 3;
            }
            None => {
                decoded.push(bytes[i]);
                i += 1;
            }
        }
    }

    String::from_utf8(decoded).ok()
}

fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// Map an envelope onto 200 with a streamed body, or a bare 404
fn envelope_response(envelope: ResponseEnvelope) -> Response {
    match envelope.into_parts() {
        (Some(content_type), Some(stream)) => {
            let headers = [(header::CONTENT_TYPE, content_type)];
            let body = Body::from_stream(ReaderStream::new(stream));
            (StatusCode::OK, headers, body).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
