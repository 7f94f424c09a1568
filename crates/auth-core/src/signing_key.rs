//! Symmetric signing key for session tokens.
//!
//! The key is built once from the configured secret and never mutated. The
//! raw secret bytes are used directly as the HMAC-SHA256 key, so any standard
//! JWT library holding the same secret can verify our tokens.

use jsonwebtoken::{DecodingKey, EncodingKey};
use ring::digest::{digest, SHA256};
use std::fmt;

use crate::errors::AuthError;
use crate::secret::{ExposeSecret, SecretString};

/// Recommended minimum secret length for HS256 (256 bits).
pub const RECOMMENDED_SECRET_BYTES: usize = 32;

/// HS256 key material plus a non-secret fingerprint.
///
/// Debug output never includes key material.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    fingerprint: String,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl SigningKey {
    /// Build the signing key from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` if the secret is empty or only
    /// whitespace.
    pub fn from_secret(secret: &SecretString) -> Result<Self, AuthError> {
        let raw = secret.expose_secret();
        if raw.trim().is_empty() {
            return Err(AuthError::Misconfigured(
                "session token secret must not be empty".to_string(),
            ));
        }

        let bytes = raw.as_bytes();
        if bytes.len() < RECOMMENDED_SECRET_BYTES {
            tracing::warn!(
                target: "auth.signing_key",
                secret_len = bytes.len(),
                recommended = RECOMMENDED_SECRET_BYTES,
                "Session token secret is shorter than recommended for HS256"
            );
        }

        let fingerprint = fingerprint(bytes);
        tracing::info!(
            target: "auth.signing_key",
            fingerprint = %fingerprint,
            "Session signing key loaded"
        );

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            fingerprint,
        })
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    /// Short SHA-256 based identifier, safe to log and to place in `kid`.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// First 8 hex chars of SHA-256 over the key bytes.
fn fingerprint(bytes: &[u8]) -> String {
    let hash = digest(&SHA256, bytes);
    hex::encode(hash.as_ref().get(..4).unwrap_or_default())
}
