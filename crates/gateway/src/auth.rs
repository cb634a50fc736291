//! Basic-auth gate with timing-safe verification
//!
//! A single shared credential guards the whole gateway. Comparison cost is
//! independent of where a guess first differs, and the server layer adds a
//! fixed delay before every rejection, so remote timing tells an attacker
//! nothing.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::Credential;

/// Outcome of the authentication gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Allowed,
    Denied,
}

/// Check a request's headers against the configured credential
///
/// A `None` credential is the documented open mode: every request is
/// allowed. Otherwise the request needs a well-formed
/// `Authorization: Basic <base64(user:pass)>` header whose username and
/// password both match; the caller never learns which field was wrong.
pub fn authenticate(headers: &HeaderMap, credential: Option<&Credential>) -> AuthOutcome {
    let Some(expected) = credential else {
        return AuthOutcome::Allowed;
    };

    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return AuthOutcome::Denied;
    };

    let Some((username, password)) = decode_basic(value) else {
        return AuthOutcome::Denied;
    };

    // Evaluate both fields unconditionally; `&` keeps the check free of a
    // data-dependent early exit.
    let user_ok = fixed_time_eq(username.as_bytes(), expected.username.as_bytes());
    let pass_ok = fixed_time_eq(password.as_bytes(), expected.password.as_bytes());
    if user_ok & pass_ok {
        AuthOutcome::Allowed
    } else {
        AuthOutcome::Denied
    }
}

/// Decode a `Basic <base64(user:pass)>` header value
///
/// The split is on the first `:`, so passwords may contain colons.
fn decode_basic(value: &str) -> Option<(String, String)> {
    let (scheme, payload) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }
    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Length- and content-independent byte comparison
///
/// Both sides are hashed before comparing digests, so neither the inputs'
/// lengths nor the position of the first differing byte shapes the timing.
fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    let a = Sha256::digest(a);
    let b = Sha256::digest(b);
    bool::from(a[..].ct_eq(&b[..]))
}
