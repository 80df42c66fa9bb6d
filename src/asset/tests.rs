//! Tests for the asset server module
//!
//! Includes unit tests and property-based tests for:
//! - Token validation and the session cookie
//! - Envelope to HTTP mapping
//! - The insets stylesheet

use super::*;
use crate::bridge::PrivilegedFileBridge;
use crate::channel::{LocalChannel, PrivilegedChannel};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Fixture {
    _dir: TempDir,
    server: WebRootServer,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(AssetServerConfig::default())
    }

    fn with_config(config: AssetServerConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let root: PathBuf = dir.path().join("module").join("webroot");
        std::fs::create_dir_all(root.join("js")).unwrap();
        std::fs::write(root.join("index.html"), b"<html>webroot</html>").unwrap();
        std::fs::write(root.join("js").join("app.mjs"), b"export default 1;").unwrap();
        std::fs::write(dir.path().join("module").join("module.prop"), b"id=demo").unwrap();

        let channel: Arc<dyn PrivilegedChannel> = Arc::new(LocalChannel::new());
        let bridge = PrivilegedFileBridge::new(&root, channel).unwrap();
        let server = WebRootServer::new(Arc::new(bridge), config);

        Self { _dir: dir, server }
    }

    fn token(&self) -> String {
        self.server.get_session_token().to_string()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_with_token(&self, path: &str) -> Response {
        let request = Request::builder()
            .uri(path)
            .header(TOKEN_HEADER, self.token())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.server.build_router().oneshot(request).await.unwrap()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_server_creation() {
        let fixture = Fixture::new();
        assert_eq!(fixture.server.port(), DEFAULT_ASSET_SERVER_PORT);
        assert_eq!(fixture.server.get_session_token().len(), 64); // 32 bytes = 64 hex chars
    }

    #[test]
    fn test_session_token_uniqueness() {
        let a = Fixture::new();
        let b = Fixture::new();
        assert_ne!(a.server.get_session_token(), b.server.get_session_token());
    }

    #[test]
    fn test_entry_url() {
        let fixture = Fixture::with_config(AssetServerConfig::with_port(8123));
        let url = fixture.server.entry_url("/index.html");
        assert_eq!(
            url,
            format!("http://127.0.0.1:8123/index.html?token={}", fixture.token())
        );
    }

    #[test]
    fn test_state_token_validation() {
        let fixture = Fixture::new();
        let state = fixture.server.state();

        assert!(state.validate_token(&state.session_token));
        assert!(!state.validate_token("invalid_token"));
        assert!(!state.validate_token(""));
        assert!(!state.validate_token(&state.session_token[..63]));
    }

    #[test]
    fn test_config_defaults() {
        let config = AssetServerConfig::default();
        assert_eq!(config.port, DEFAULT_ASSET_SERVER_PORT);
        assert!(config.require_token);

        let config: AssetServerConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.require_token);
    }

    #[test]
    fn test_insets_css() {
        let css = Insets::new(24, 48, 0, 0).css();
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--safe-area-inset-top: 24px;"));
        assert!(css.contains("--safe-area-inset-bottom: 48px;"));
        assert!(css.contains("--window-inset-left: var(--safe-area-inset-left, 0px);"));
        assert!(css.contains("--f7-safe-area-right: var(--window-inset-right, 0px) !important;"));
    }

    #[test]
    fn test_insets_state() {
        let state = InsetsState::default();
        assert_eq!(state.get(), Insets::default());

        state.set(Insets::new(1, 2, 3, 4));
        assert!(state.stylesheet().contains("--safe-area-inset-left: 3px;"));
        assert!(state.stylesheet().contains("--safe-area-inset-right: 4px;"));
    }

    #[test]
    fn test_insets_from_str() {
        assert_eq!("24,48,0,0".parse::<Insets>(), Ok(Insets::new(24, 48, 0, 0)));
        assert_eq!(" 1, 2 ,3,4".parse::<Insets>(), Ok(Insets::new(1, 2, 3, 4)));
        assert!("24,48,0".parse::<Insets>().is_err());
        assert!("24,48,0,0,0".parse::<Insets>().is_err());
        assert!("24,-1,0,0".parse::<Insets>().is_err());
        assert!("".parse::<Insets>().is_err());
    }

    #[test]
    fn test_config_insets_partial() {
        let config: AssetServerConfig =
            serde_json::from_str(r#"{"insets": {"top": 24}}"#).unwrap();
        assert_eq!(config.insets, Insets::new(24, 0, 0, 0));
        assert_eq!(AssetServerConfig::default().insets, Insets::default());
    }

    #[test]
    fn test_error_status() {
        use axum::response::IntoResponse;

        assert!(AssetError::InvalidToken.is_forbidden());
        assert_eq!(
            AssetError::InvalidToken.into_response().status(),
            StatusCode::FORBIDDEN
        );
        let internal = AssetError::Internal {
            reason: "boom".to_string(),
        };
        assert!(!internal.is_forbidden());
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let fixture = Fixture::new();
        let response = fixture.get_with_token("/index.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()["X-Content-Type-Options"], "nosniff");
        assert_eq!(response.headers()["X-Frame-Options"], "DENY");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(body_bytes(response).await, b"<html>webroot</html>");
    }

    #[tokio::test]
    async fn test_serves_nested_file() {
        let fixture = Fixture::new();
        let response = fixture.get_with_token("/js/app.mjs").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
        assert_eq!(body_bytes(response).await, b"export default 1;");
    }

    #[tokio::test]
    async fn test_missing_and_escaping_are_identical() {
        let fixture = Fixture::new();

        let missing = fixture.get_with_token("/nope.html").await;
        let escaping = fixture.get_with_token("/js/../../module.prop").await;

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(escaping.status(), StatusCode::NOT_FOUND);
        assert!(missing.headers().get(header::CONTENT_TYPE).is_none());
        assert!(escaping.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(missing.headers().len(), escaping.headers().len());
        assert!(body_bytes(missing).await.is_empty());
        assert!(body_bytes(escaping).await.is_empty());
    }

    #[tokio::test]
    async fn test_directory_root_is_not_found() {
        let fixture = Fixture::new();
        let response = fixture.get_with_token("/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_token_is_forbidden() {
        let fixture = Fixture::new();

        let response = fixture.get("/index.html").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_bytes(response).await.is_empty());

        let response = fixture.get("/index.html?token=deadbeef").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_query_token_issues_cookie() {
        let fixture = Fixture::new();
        let uri = format!("/index.html?token={}", fixture.token());
        let response = fixture.get(&uri).await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("{}={}", SESSION_COOKIE, fixture.token())));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[tokio::test]
    async fn test_header_token_does_not_issue_cookie() {
        let fixture = Fixture::new();
        let response = fixture.get_with_token("/index.html").await;
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_cookie_authenticates_sub_resources() {
        let fixture = Fixture::new();
        let request = Request::builder()
            .uri("/js/app.mjs")
            .header(
                header::COOKIE,
                format!("{}={}", SESSION_COOKIE, fixture.token()),
            )
            .body(Body::empty())
            .unwrap();

        let response = fixture.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/js/app.mjs")
            .header(header::COOKIE, format!("{}=wrong", SESSION_COOKIE))
            .body(Body::empty())
            .unwrap();
        let response = fixture.send(request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_query_token_falls_back_to_cookie() {
        let fixture = Fixture::new();
        let request = Request::builder()
            .uri("/js/app.mjs?token=stale")
            .header(
                header::COOKIE,
                format!("{}={}", SESSION_COOKIE, fixture.token()),
            )
            .body(Body::empty())
            .unwrap();

        let response = fixture.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_repeated_query_token() {
        let fixture = Fixture::new();

        let uri = format!("/index.html?token=stale&token={}", fixture.token());
        let response = fixture.get(&uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_some());

        let response = fixture.get("/index.html?token=a&token=b").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_percent_encoded_path_is_decoded() {
        let fixture = Fixture::new();
        let response = fixture.get_with_token("/js/app%2Emjs").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"export default 1;");
    }

    #[tokio::test]
    async fn test_non_utf8_path_is_not_found() {
        let fixture = Fixture::new();
        let missing = fixture.get_with_token("/nope.html").await;
        let response = fixture.get_with_token("/%FF%FE.html").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().len(), missing.headers().len());
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_encoded_traversal_is_not_found() {
        let fixture = Fixture::new();
        let response = fixture.get_with_token("/js/%2E%2E/%2E%2E/module.prop").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(fixture.server.state().bridge.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_token_check_can_be_disabled() {
        let config = AssetServerConfig {
            require_token: false,
            ..Default::default()
        };
        let fixture = Fixture::with_config(config);

        let response = fixture.get("/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["X-Frame-Options"], "DENY");
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let fixture = Fixture::new();
        let request = Request::builder()
            .method("POST")
            .uri("/index.html")
            .header(TOKEN_HEADER, fixture.token())
            .body(Body::empty())
            .unwrap();

        let response = fixture.send(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_insets_stylesheet() {
        let fixture = Fixture::new();
        let response = fixture
            .get_with_token(&format!("/{}", INSETS_PATH))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        let css = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(css.contains("--safe-area-inset-top: 0px;"));
    }

    #[tokio::test]
    async fn test_configured_insets_are_served() {
        let config = AssetServerConfig {
            insets: Insets::new(32, 16, 0, 8),
            ..Default::default()
        };
        let fixture = Fixture::with_config(config);

        let response = fixture
            .get_with_token(&format!("/{}", INSETS_PATH))
            .await;
        let css = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(css.contains("--safe-area-inset-top: 32px;"));
        assert!(css.contains("--safe-area-inset-bottom: 16px;"));
        assert!(css.contains("--safe-area-inset-right: 8px;"));
    }

    #[tokio::test]
    async fn test_updated_insets_are_served_on_next_load() {
        let fixture = Fixture::new();
        let path = format!("/{}", INSETS_PATH);

        let before = body_bytes(fixture.get_with_token(&path).await).await;
        fixture.server.insets().set(Insets::new(40, 0, 0, 0));
        let after = String::from_utf8(body_bytes(fixture.get_with_token(&path).await).await).unwrap();

        assert_ne!(before, after.as_bytes());
        assert!(after.contains("--safe-area-inset-top: 40px;"));
    }

    #[tokio::test]
    async fn test_counters_follow_requests() {
        let fixture = Fixture::new();
        fixture.get_with_token("/index.html").await;
        fixture.get_with_token("/missing.css").await;
        fixture.get_with_token("/../module.prop").await;

        let stats = fixture.server.state().bridge.stats();
        assert_eq!(stats.served, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.rejected, 1);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any token other than the session token is rejected
        #[test]
        fn prop_only_session_token_validates(token in "[0-9a-f]{0,80}") {
            let fixture = Fixture::new();
            let state = fixture.server.state();
            prop_assert_eq!(state.validate_token(&token), token == state.session_token);
        }

        /// Generated tokens are lowercase hex of fixed length
        #[test]
        fn prop_token_shape(_seed in any::<u8>()) {
            let fixture = Fixture::new();
            let token = fixture.token();
            prop_assert_eq!(token.len(), 64);
            prop_assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
