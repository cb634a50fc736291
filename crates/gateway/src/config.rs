//! Gateway configuration loaded once at startup
//!
//! Everything here is read-only after [`GatewayConfig::from_env`] returns;
//! request tasks share the config through an `Arc` and never mutate it.

use std::env;
use std::fmt;
use std::net::IpAddr;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REMOTE};

/// Length of generated passwords
const GENERATED_PASSWORD_LEN: usize = 24;

/// Username paired with a generated password
const GENERATED_USERNAME: &str = "alldebrid";

/// Shared-credential pair required by the auth gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    /// Generate a random credential pair
    ///
    /// Used when no explicit pair is configured; the server binary prints
    /// it once so the operator can log in. It is never persisted.
    pub fn generate() -> Self {
        let password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PASSWORD_LEN)
            .map(char::from)
            .collect();
        Self {
            username: GENERATED_USERNAME.to_string(),
            password,
        }
    }
}

/// Where the active credential came from at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Explicit ALD_USERNAME / ALD_PASSWORD pair
    Explicit,
    /// Random pair generated at startup
    Generated,
    /// ALD_NO_AUTH open mode
    Disabled,
}

/// Immutable gateway configuration
///
/// Built once at startup and shared read-only across request tasks.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Credential required for every request; `None` is the documented
    /// open mode, not a misconfiguration
    pub credential: Option<Credential>,
    /// Exact origins allowed to read responses cross-origin when auth is on
    pub allowed_origins: Vec<String>,
    /// rclone remote to serve, e.g. `alldebrid:`
    pub remote: String,
}

impl GatewayConfig {
    /// Load configuration from `ALD_*` environment variables
    ///
    /// `port_override` (the optional CLI argument) wins over `ALD_PORT`.
    /// Returns the config together with how the credential was sourced, so
    /// the binary can print a generated pair exactly once.
    pub fn from_env(port_override: Option<u16>) -> Result<(Self, CredentialSource), ConfigError> {
        let host = env::var("ALD_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match port_override {
            Some(port) => port,
            None => match env::var("ALD_PORT") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
                Err(_) => DEFAULT_PORT,
            },
        };

        // Binding anything but loopback exposes the whole remote to the
        // network; require the explicit opt-in.
        if !host_is_loopback(&host) && !flag_set("ALD_PUBLIC") {
            return Err(ConfigError::PublicBindWithoutOptIn(host));
        }

        let (credential, source) = if flag_set("ALD_NO_AUTH") {
            (None, CredentialSource::Disabled)
        } else {
            match (env::var("ALD_USERNAME").ok(), env::var("ALD_PASSWORD").ok()) {
                (Some(username), Some(password)) => (
                    Some(Credential { username, password }),
                    CredentialSource::Explicit,
                ),
                (None, None) => (Some(Credential::generate()), CredentialSource::Generated),
                _ => return Err(ConfigError::PartialCredential),
            }
        };

        let allowed_origins = env::var("ALD_ALLOWED_ORIGINS")
            .map(|raw| parse_allowed_origins(&raw))
            .unwrap_or_default();

        let remote = env::var("ALD_REMOTE").unwrap_or_else(|_| DEFAULT_REMOTE.to_string());

        Ok((
            Self {
                host,
                port,
                credential,
                allowed_origins,
                remote,
            },
            source,
        ))
    }

    /// Whether requests must authenticate
    pub fn auth_enabled(&self) -> bool {
        self.credential.is_some()
    }

    /// The address the listener binds
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Exact-match origin list from a comma-separated value
pub fn parse_allowed_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `host` is a loopback-only bind
fn host_is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Whether a boolean-ish env value is set
fn truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn flag_set(name: &str) -> bool {
    env::var(name).map(|value| truthy(&value)).unwrap_or(false)
}

/// Startup configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// ALD_PORT was not a valid port number
    InvalidPort(String),
    /// A non-loopback host was configured without ALD_PUBLIC=1
    PublicBindWithoutOptIn(String),
    /// Only one of ALD_USERNAME / ALD_PASSWORD was set
    PartialCredential,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort(raw) => write!(f, "invalid ALD_PORT value: {}", raw),
            ConfigError::PublicBindWithoutOptIn(host) => write!(
                f,
                "refusing to bind non-loopback host {} without ALD_PUBLIC=1",
                host
            ),
            ConfigError::PartialCredential => {
                write!(f, "ALD_USERNAME and ALD_PASSWORD must be set together")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
