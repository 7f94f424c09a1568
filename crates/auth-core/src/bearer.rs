//! Bearer credential extraction.
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! The scheme is matched case-insensitively and surrounding whitespace is
//! ignored. A header with the right scheme but no credential, or a
//! credential containing whitespace, is treated the same as a missing header.

use axum::http::{header::AUTHORIZATION, HeaderMap};

const BEARER_SCHEME: &str = "bearer";

/// Extract the credential from an `Authorization` header value.
///
/// Returns `None` when the scheme is not `Bearer` or the credential is empty
/// or contains whitespace.
#[must_use]
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let (scheme, credential) = header_value.trim().split_once(char::is_whitespace)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let credential = credential.trim();
    if credential.is_empty() || credential.contains(char::is_whitespace) {
        None
    } else {
        Some(credential)
    }
}

/// Extract the bearer credential from request headers.
///
/// Returns `None` when the header is missing, not valid ASCII, or not a
/// bearer credential.
#[must_use]
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer)
}
