//! Metrics definitions for the token core.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! No exporter is installed here; the embedding service chooses one.
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `kind`: 2 values (issue, refresh)
//! - `status`: 2 values (success, error)
//! - `error_category`: the fixed set of [`crate::AuthError::code`] values, or `none`
//! - `cache_status`: 2 values (hit, miss)

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// Session Token Metrics
// ============================================================================

/// Record a session token being minted.
///
/// Metric: `auth_token_issued_total`
/// Labels: `kind`
pub fn record_token_issued(kind: &str) {
    counter!("auth_token_issued_total", "kind" => kind.to_string()).increment(1);
}

/// Record a session token validation result.
///
/// Metric: `auth_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Identity Metrics
// ============================================================================

/// Record an external identity token verification result.
///
/// Metric: `auth_identity_verifications_total`
/// Labels: `status`, `error_category`
pub fn record_identity_verification(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_identity_verifications_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

/// Record an issuer key lookup against the JWKS cache.
///
/// Metric: `auth_jwks_requests_total`
/// Labels: `cache_status`
pub fn record_jwks_request(cache_status: &str) {
    counter!("auth_jwks_requests_total", "cache_status" => cache_status.to_string()).increment(1);
}

/// Record the duration and outcome of a JWKS fetch.
///
/// Metric: `auth_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("auth_jwks_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());
}
