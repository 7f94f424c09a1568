//! Custom test assertions for session tokens
//!
//! These inspect the token without verifying it, so they can be used on
//! tokens from any service instance.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
    #[serde(default)]
    kid: Option<String>,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("JWT segment {} is not base64url: {}", index, e))
}

fn header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

fn payload(token: &str) -> serde_json::Map<String, Value> {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for session tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject("user-42")
///     .assert_signed_by(service.key_fingerprint());
/// ```
pub trait TokenAssertions {
    /// Three segments, HS256 header, `sub`/`iat`/`exp` present.
    fn assert_valid_jwt(&self) -> &Self;

    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Header `kid` equals the signing key fingerprint.
    fn assert_signed_by(&self, fingerprint: &str) -> &Self;

    fn assert_lifetime(&self, issued_at: i64, expires_at: i64) -> &Self;

    fn assert_has_claim(&self, name: &str, value: Value) -> &Self;

    fn assert_lacks_claim(&self, name: &str) -> &Self;
}

impl<T: AsRef<str> + ?Sized> TokenAssertions for T {
    fn assert_valid_jwt(&self) -> &Self {
        let token = self.as_ref();
        let parts = token.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header = header(token);
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        let claims = payload(token);
        for required in ["sub", "iat", "exp"] {
            assert!(
                claims.contains_key(required),
                "JWT claims missing '{}'",
                required
            );
        }

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = payload(self.as_ref());
        assert_eq!(
            claims.get("sub").and_then(Value::as_str),
            Some(subject),
            "Expected subject '{}'",
            subject
        );
        self
    }

    fn assert_signed_by(&self, fingerprint: &str) -> &Self {
        let kid = header(self.as_ref()).kid;
        assert_eq!(
            kid.as_deref(),
            Some(fingerprint),
            "Expected kid '{}', got {:?}",
            fingerprint,
            kid
        );
        self
    }

    fn assert_lifetime(&self, issued_at: i64, expires_at: i64) -> &Self {
        let claims = payload(self.as_ref());
        assert_eq!(claims.get("iat").and_then(Value::as_i64), Some(issued_at));
        assert_eq!(claims.get("exp").and_then(Value::as_i64), Some(expires_at));
        self
    }

    fn assert_has_claim(&self, name: &str, value: Value) -> &Self {
        let claims = payload(self.as_ref());
        assert_eq!(
            claims.get(name),
            Some(&value),
            "Expected claim '{}' = {}",
            name,
            value
        );
        self
    }

    fn assert_lacks_claim(&self, name: &str) -> &Self {
        let claims = payload(self.as_ref());
        assert!(
            !claims.contains_key(name),
            "Claim '{}' should not be present",
            name
        );
        self
    }
}
