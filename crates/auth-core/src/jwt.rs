//! JWT utilities shared by the session codec and the identity verifier.
//!
//! - Size limit for DoS prevention
//! - Structural pre-check (exactly three segments)
//! - Signature segment encoding check
//! - Clock skew constants and `iat` validation
//!
//! # Security
//!
//! Tokens are size-checked and split BEFORE any base64 decoding or
//! cryptographic work, so hostile input is rejected with minimal resource use.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;

use crate::clock::duration_secs;
use crate::errors::AuthError;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical session tokens are 200-400 bytes and Google ID tokens are
/// around 1.2KB, so 8KB leaves room for expansion while rejecting abuse.
/// Checked BEFORE base64 decode and signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for external `iat` validation (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Reject oversized tokens and anything that is not `header.payload.signature`.
///
/// # Errors
///
/// Returns `AuthError::Malformed` when the token exceeds
/// [`MAX_JWT_SIZE_BYTES`], does not have exactly three segments, or has an
/// empty segment.
pub fn check_structure(token: &str) -> Result<(), AuthError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "auth.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(AuthError::Malformed);
    }

    let segments = token.split('.').count();
    if segments != 3 {
        tracing::debug!(
            target: "auth.jwt",
            segments = segments,
            "Token rejected: invalid JWT format"
        );
        return Err(AuthError::Malformed);
    }

    if token.split('.').any(str::is_empty) {
        tracing::debug!(target: "auth.jwt", "Token rejected: empty JWT segment");
        return Err(AuthError::Malformed);
    }

    Ok(())
}

/// Reject a signature segment that is not canonical unpadded base64url.
///
/// Call only after the header has been accepted: from that point a damaged
/// signature segment is a bad signature, not a malformed token.
///
/// # Errors
///
/// Returns `AuthError::SignatureInvalid` when the last segment does not decode.
pub fn check_signature_encoding(token: &str) -> Result<(), AuthError> {
    let signature = token.rsplit('.').next().unwrap_or_default();

    URL_SAFE_NO_PAD.decode(signature).map(|_| ()).map_err(|e| {
        tracing::debug!(
            target: "auth.jwt",
            error = %e,
            "Token rejected: signature segment is not base64url"
        );
        AuthError::SignatureInvalid
    })
}

/// Validate the `iat` claim against `now` with clock skew tolerance.
///
/// # Errors
///
/// Returns `AuthError::IssuedInFuture` when `iat` is more than `clock_skew`
/// ahead of `now`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), AuthError> {
    let max_iat = now.saturating_add(duration_secs(clock_skew));

    if iat > max_iat {
        tracing::debug!(
            target: "auth.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(AuthError::IssuedInFuture);
    }

    Ok(())
}
