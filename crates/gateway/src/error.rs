//! Request-level error taxonomy and its HTTP mapping
//!
//! Bodies stay minimal on purpose: they name the rejection class and
//! nothing else. Backend diagnostics go to the log, never to the client.

use std::fmt;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use remote::StoreError;

use crate::constants::REALM;
use crate::path::PathError;

/// Errors a request can end in before any response bytes are sent
#[derive(Debug)]
pub enum GatewayError {
    /// Missing or wrong credentials
    AuthRequired,
    /// The request path failed validation
    PathUnsafe(PathError),
    /// The remote has no such object or directory
    NotFound,
    /// The backend failed before anything was streamed
    Backend(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::AuthRequired => write!(f, "authentication required"),
            GatewayError::PathUnsafe(reason) => write!(f, "unsafe path: {}", reason),
            GatewayError::NotFound => write!(f, "not found"),
            GatewayError::Backend(detail) => write!(f, "backend failure: {}", detail),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<PathError> for GatewayError {
    fn from(err: PathError) -> Self {
        GatewayError::PathUnsafe(err)
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => GatewayError::NotFound,
            other => GatewayError::Backend(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::AuthRequired => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::WWW_AUTHENTICATE,
                    format!("Basic realm=\"{}\"", REALM),
                )],
                "authentication required\n",
            )
                .into_response(),
            GatewayError::PathUnsafe(reason) => (
                StatusCode::FORBIDDEN,
                format!("forbidden: {}\n", reason),
            )
                .into_response(),
            GatewayError::NotFound => (StatusCode::NOT_FOUND, "not found\n").into_response(),
            GatewayError::Backend(detail) => {
                // The detail may name remote paths; keep it out of the body.
                tracing::error!("backend failure: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "backend failure\n").into_response()
            }
        }
    }
}
