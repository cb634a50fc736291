//! Authenticated HTTP gateway over a remote media store
//!
//! This crate provides the request pipeline: Basic-auth gate, path
//! validation, CORS policy, directory-listing rendering, and the axum
//! server that wires them to an [`remote::ObjectStore`].

pub mod auth;
pub mod config;
pub mod constants;
pub mod cors;
pub mod error;
pub mod path;
pub mod render;
pub mod server;

pub use config::{Credential, CredentialSource, GatewayConfig};
pub use error::GatewayError;
pub use server::GatewayApi;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
