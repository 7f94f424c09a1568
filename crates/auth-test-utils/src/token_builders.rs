//! Builders for external identity tokens and session services
//!
//! ```rust,ignore
//! let token = IdTokenBuilder::new(TEST_NOW)
//!     .audience("someone-else")
//!     .sign(&issuer_key);
//! ```

use std::sync::Arc;
use std::time::Duration;

use auth_core::clock::ManualClock;
use auth_core::secret::SecretString;
use auth_core::signing_key::SigningKey;
use auth_core::TokenService;
use serde_json::{json, Map, Value};

use crate::crypto_fixtures::IssuerKey;
use crate::test_ids::{
    TEST_CLIENT_ID, TEST_EMAIL, TEST_ISSUER, TEST_SESSION_SECRET, TEST_SUBJECT,
};

/// Builder for identity tokens as the external issuer would mint them.
///
/// Defaults to a valid Google-shaped token issued at `issued_at` and
/// expiring an hour later.
#[derive(Debug, Clone)]
pub struct IdTokenBuilder {
    claims: Map<String, Value>,
}

impl IdTokenBuilder {
    pub fn new(issued_at: i64) -> Self {
        let claims = json!({
            "iss": TEST_ISSUER,
            "aud": TEST_CLIENT_ID,
            "azp": TEST_CLIENT_ID,
            "sub": TEST_SUBJECT,
            "email": TEST_EMAIL,
            "email_verified": true,
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://example.com/ada.png",
            "locale": "en",
            "iat": issued_at,
            "exp": issued_at + 3600,
        });

        match claims {
            Value::Object(map) => Self { claims: map },
            _ => unreachable!("json! object literal"),
        }
    }

    pub fn issuer(self, iss: &str) -> Self {
        self.claim("iss", json!(iss))
    }

    pub fn audience(self, aud: &str) -> Self {
        self.claim("aud", json!(aud))
    }

    pub fn audiences(self, auds: &[&str]) -> Self {
        self.claim("aud", json!(auds))
    }

    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", json!(sub))
    }

    pub fn issued_at(self, iat: i64) -> Self {
        self.claim("iat", json!(iat))
    }

    pub fn expires_at(self, exp: i64) -> Self {
        self.claim("exp", json!(exp))
    }

    pub fn email_verified(self, value: Value) -> Self {
        self.claim("email_verified", value)
    }

    /// Set any claim.
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely.
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    pub fn sign(&self, key: &IssuerKey) -> String {
        key.sign(&self.claims())
    }
}

/// Session token service on a manual clock, signed with
/// [`TEST_SESSION_SECRET`].
pub fn test_token_service(clock: Arc<ManualClock>, ttl: Duration) -> TokenService {
    TokenService::new(test_signing_key(), ttl, clock)
}

pub fn test_signing_key() -> SigningKey {
    SigningKey::from_secret(&SecretString::from(TEST_SESSION_SECRET))
        .expect("Test session secret is valid")
}
