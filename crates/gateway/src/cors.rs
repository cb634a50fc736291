//! Cross-origin response policy
//!
//! With auth disabled the gateway behaves like the open media servers it
//! replaces: any origin may read. With auth enabled, only origins that
//! exactly equal a configured entry are echoed back, and every value is
//! scrubbed of CR/LF before it can reach a response header.

use axum::http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, VARY,
};

/// Strip every CR and LF byte from a value destined for a response header
///
/// Applied before any comparison or echo, so a crafted inbound value can
/// never smuggle extra header lines into the response. Use this for any
/// request-derived string that gets echoed into a header, not just the
/// origin.
pub fn sanitize_header_value(raw: &str) -> String {
    raw.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Compute the CORS headers for one response
///
/// The allow-methods and allow-headers lines are always present. The
/// allow-origin line depends on the mode:
/// - auth disabled: `*`, unconditionally;
/// - auth enabled: the sanitized request origin is compared against the
///   allowed set with exact string equality only (no prefix, suffix, or
///   subdomain matching) and echoed with `Vary: Origin` on a hit; on a
///   miss, or with an empty allowed set, no allow-origin header at all.
pub fn headers_for(
    request_origin: Option<&str>,
    auth_enabled: bool,
    allowed_origins: &[String],
) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, HEAD"),
        ),
        (
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ),
    ];

    if !auth_enabled {
        headers.push((ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")));
        return headers;
    }

    let Some(origin) = request_origin else {
        return headers;
    };
    let origin = sanitize_header_value(origin);

    if allowed_origins.iter().any(|allowed| *allowed == origin) {
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.push((ACCESS_CONTROL_ALLOW_ORIGIN, value));
            headers.push((VARY, HeaderValue::from_static("Origin")));
        }
    }

    headers
}
