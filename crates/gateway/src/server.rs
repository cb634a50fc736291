//! HTTP server wiring the gateway pipeline
//!
//! Per request: authenticate, validate the path, then either render a
//! directory listing or stream the object. CORS headers are applied to
//! every response on the way out, including auth and validation failures.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderValue, ORIGIN};
use axum::http::{StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use remote::{DirectoryEntry, ObjectStore};

use crate::auth::{authenticate, AuthOutcome};
use crate::config::GatewayConfig;
use crate::constants::AUTH_FAILURE_DELAY_MS;
use crate::cors;
use crate::error::GatewayError;
use crate::path;
use crate::render;

/// Shared read-only context handed to every request task
#[derive(Clone)]
struct AppState {
    config: Arc<GatewayConfig>,
    store: Arc<dyn ObjectStore>,
}

/// Gateway API for managing the HTTP server
#[derive(Clone)]
pub struct GatewayApi {
    state: AppState,
}

impl GatewayApi {
    /// Create a new gateway over the given store
    pub fn new(config: GatewayConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            state: AppState {
                config: Arc::new(config),
                store,
            },
        }
    }

    /// Create the axum router with the full request pipeline
    ///
    /// Layer order, outermost first: trace, CORS, auth gate, handler. The
    /// auth gate therefore runs before any path validation or backend
    /// access, and CORS headers reach 401/403 responses too.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(browse))
            .route("/*path", get(browse))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_auth,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                apply_cors,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until the process exits
    ///
    /// Each accepted connection is handled on its own task, so a
    /// long-running stream never blocks directory browsing elsewhere.
    pub async fn serve(self) -> crate::Result<()> {
        let addr = self.state.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("gateway listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

/// Gate every request behind the configured credential
///
/// Every rejection pauses for a fixed delay before the 401 to blunt
/// brute-force guessing; the delay blocks only this connection's task.
async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match authenticate(req.headers(), state.config.credential.as_ref()) {
        AuthOutcome::Allowed => next.run(req).await,
        AuthOutcome::Denied => {
            tokio::time::sleep(Duration::from_millis(AUTH_FAILURE_DELAY_MS)).await;
            GatewayError::AuthRequired.into_response()
        }
    }
}

/// Attach the per-response CORS header set
async fn apply_cors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let mut response = next.run(req).await;
    for (name, value) in cors::headers_for(
        origin.as_deref(),
        state.config.auth_enabled(),
        &state.config.allowed_origins,
    ) {
        response.headers_mut().insert(name, value);
    }
    response
}

/// Resolve one request: directory listing or object stream
///
/// The target's type is probed by attempting a directory listing first;
/// anything not enumerable as a directory is served as an object. The raw
/// (still percent-encoded) request path goes through validation before the
/// store sees it.
async fn browse(State(state): State<AppState>, uri: Uri) -> Result<Response, GatewayError> {
    let rel_path = path::validate(uri.path())?;

    match state.store.list(&rel_path).await {
        Ok(entries) => Ok(listing_response(&entries, &rel_path)),
        // A failing root listing has no file to fall back to.
        Err(err) if rel_path.is_empty() => Err(err.into()),
        Err(err) => {
            tracing::debug!("listing {:?} failed ({}), serving as object", rel_path, err);
            stream_response(&state, &rel_path).await
        }
    }
}

/// Build the listing response with its security headers
fn listing_response(entries: &[DirectoryEntry], current_path: &str) -> Response {
    let body = render::render(entries, current_path);
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("default-src 'none'; style-src 'unsafe-inline'"),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        ],
        body,
    )
        .into_response()
}

/// Stream an object as the response body
///
/// `Accept-Ranges: bytes` is declared but `Range` requests are not
/// honored; the full body is always returned. A failure after the first
/// chunk cannot be signaled over HTTP anymore: the stream logs it and the
/// client observes a truncated transfer.
async fn stream_response(state: &AppState, rel_path: &str) -> Result<Response, GatewayError> {
    let stream = state.store.open_stream(rel_path).await?;

    let mime = mime_guess::from_path(rel_path)
        .first_or_octet_stream()
        .to_string();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .map_err(|e| GatewayError::Backend(e.to_string()))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use futures_util::stream;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use remote::{ByteStream, StoreError, StoreResult};

    use crate::config::Credential;

    /// In-memory store with a fixed two-level tree
    #[derive(Clone)]
    struct FakeStore;

    fn dir(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            is_dir: true,
        }
    }

    fn file(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            is_dir: false,
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn list(&self, path: &str) -> StoreResult<Vec<DirectoryEntry>> {
            match path.trim_end_matches('/') {
                "" => Ok(vec![dir("movies"), file("notes.txt")]),
                "movies" => Ok(vec![file("action.mp4")]),
                _ => Err(StoreError::NotFound),
            }
        }

        async fn open_stream(&self, path: &str) -> StoreResult<ByteStream> {
            match path {
                "movies/action.mp4" => {
                    let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(b"FAKE MOVIE"))];
                    Ok(Box::pin(stream::iter(chunks)))
                }
                _ => Err(StoreError::NotFound),
            }
        }
    }

    fn config(credential: Option<Credential>, allowed_origins: Vec<String>) -> GatewayConfig {
        GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            credential,
            allowed_origins,
            remote: "alldebrid:".to_string(),
        }
    }

    fn credential() -> Credential {
        Credential {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
        }
    }

    fn router(credential: Option<Credential>, allowed_origins: Vec<String>) -> Router {
        GatewayApi::new(config(credential, allowed_origins), Arc::new(FakeStore)).router()
    }

    fn basic_header(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
    }

    fn get_request(uri: &str) -> http::Request<Body> {
        http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[tokio::test]
    async fn test_root_listing_rendered() {
        let response = router(None, Vec::new())
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            response
                .headers()
                .get(header::X_CONTENT_TYPE_OPTIONS)
                .unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert!(response
            .headers()
            .contains_key(header::CONTENT_SECURITY_POLICY));

        let body = body_string(response).await;
        assert!(body.contains("movies"));
        assert!(body.contains("notes.txt"));
    }

    #[tokio::test]
    async fn test_file_streamed_in_full() {
        let response = router(None, Vec::new())
            .oneshot(get_request("/movies/action.mp4"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "video/mp4"
        );
        assert_eq!(
            response.headers().get(header::ACCEPT_RANGES).unwrap(),
            "bytes"
        );
        assert_eq!(body_string(response).await, "FAKE MOVIE");
    }

    #[tokio::test]
    async fn test_range_requests_are_not_honored() {
        let request = http::Request::builder()
            .uri("/movies/action.mp4")
            .header(header::RANGE, "bytes=0-3")
            .body(Body::empty())
            .unwrap();
        let response = router(None, Vec::new()).oneshot(request).await.unwrap();

        // Full body, plain 200: the declared capability is not implemented.
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "FAKE MOVIE");
    }

    #[tokio::test]
    async fn test_unknown_object_is_not_found() {
        let response = router(None, Vec::new())
            .oneshot(get_request("/nope.mp4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_rejected_despite_valid_credentials() {
        let request = http::Request::builder()
            .uri("/../../etc/passwd")
            .header(header::AUTHORIZATION, basic_header("alice", "s3cret"))
            .body(Body::empty())
            .unwrap();
        let response = router(Some(credential()), Vec::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_string(response).await;
        assert!(body.contains("path traversal"));
        assert!(!body.contains("etc"));
    }

    #[tokio::test]
    async fn test_missing_credentials_challenged_without_leaking_listing() {
        let response = router(Some(credential()), Vec::new())
            .oneshot(get_request("/movies/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap(),
            "Basic realm=\"alldebrid\""
        );
        let body = body_string(response).await;
        assert!(!body.contains("action.mp4"));
    }

    #[tokio::test]
    async fn test_wrong_password_denied() {
        let request = http::Request::builder()
            .uri("/movies/")
            .header(header::AUTHORIZATION, basic_header("alice", "wrong"))
            .body(Body::empty())
            .unwrap();
        let response = router(Some(credential()), Vec::new())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_credentials_browse_directory() {
        let request = http::Request::builder()
            .uri("/movies/")
            .header(header::AUTHORIZATION, basic_header("alice", "s3cret"))
            .body(Body::empty())
            .unwrap();
        let response = router(Some(credential()), Vec::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("action.mp4"));
    }

    #[tokio::test]
    async fn test_open_mode_gets_wildcard_cors() {
        let response = router(None, Vec::new())
            .oneshot(get_request("/"))
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_allowed_origin_echoed_with_auth() {
        let request = http::Request::builder()
            .uri("/movies/")
            .header(header::AUTHORIZATION, basic_header("alice", "s3cret"))
            .header(ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap();
        let response = router(
            Some(credential()),
            vec!["http://example.com".to_string()],
        )
        .oneshot(request)
        .await
        .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://example.com"
        );
        assert_eq!(response.headers().get(header::VARY).unwrap(), "Origin");
    }

    #[tokio::test]
    async fn test_unlisted_origin_gets_no_allow_origin() {
        let request = http::Request::builder()
            .uri("/movies/")
            .header(header::AUTHORIZATION, basic_header("alice", "s3cret"))
            .header(ORIGIN, "http://example.com.evil.com")
            .body(Body::empty())
            .unwrap();
        let response = router(
            Some(credential()),
            vec!["http://example.com".to_string()],
        )
        .oneshot(request)
        .await
        .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        // The ones that do not depend on the origin are still there.
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            "GET, HEAD"
        );
    }

    #[tokio::test]
    async fn test_auth_failure_carries_cors_headers() {
        let response = router(Some(credential()), Vec::new())
            .oneshot(get_request("/movies/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            "GET, HEAD"
        );
    }

    #[tokio::test]
    async fn test_post_is_method_not_allowed() {
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri("/movies/")
            .body(Body::empty())
            .unwrap();
        let response = router(None, Vec::new()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_head_request_served() {
        let request = http::Request::builder()
            .method(http::Method::HEAD)
            .uri("/movies/action.mp4")
            .body(Body::empty())
            .unwrap();
        let response = router(None, Vec::new()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "video/mp4"
        );
    }
}
