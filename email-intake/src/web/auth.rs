//! Function key verification.
//!
//! Callers present the key either in the `x-functions-key` header or as the
//! `code` query parameter, the same places a Functions host looks.

use axum::http::HeaderMap;
use tracing::warn;

/// Header carrying the function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Query parameter carrying the function key.
pub const FUNCTION_KEY_PARAM: &str = "code";

/// Check if function key verification is enabled.
pub fn is_key_verification_enabled(function_key: &Option<String>) -> bool {
    function_key
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

/// Pull the caller's key from the header, falling back to the query string.
pub fn presented_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(key) = headers
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(key.to_string());
    }

    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(name, _)| name == FUNCTION_KEY_PARAM)
            .map(|(_, value)| value.into_owned())
    })
}

/// Verify the presented key against the configured one.
pub fn verify_function_key(expected: &str, presented: Option<&str>) -> bool {
    match presented {
        Some(provided) if constant_time_compare(expected, provided) => true,
        Some(_) => {
            warn!("function_key_invalid");
            false
        }
        None => {
            warn!("function_key_missing");
            false
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
