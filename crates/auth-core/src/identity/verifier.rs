//! External identity token verification.
//!
//! Checks run in a fixed order, and the first failure wins:
//!
//! 1. size and segment structure
//! 2. header decodes and names an accepted algorithm (RS256, EdDSA)
//! 3. issuer key lookup by `kid`
//! 4. signature
//! 5. issuer
//! 6. audience
//! 7. expiry, then `iat` against the clock skew tolerance
//!
//! Signature is verified before any claim is trusted.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::errors::AuthError;
use crate::identity::assertion::IdentityAssertion;
use crate::identity::jwks::JwksKeySource;
use crate::identity::key_source::IssuerKeySource;
use crate::jwt::{check_signature_encoding, check_structure, validate_iat_at};
use crate::observability::metrics::record_identity_verification;

/// Algorithms accepted from the external issuer.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 2] = [Algorithm::RS256, Algorithm::EdDSA];

/// `aud` is either a single string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::One(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|a| a == client_id),
        }
    }
}

/// Some issuers send `email_verified` as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Flag::Bool(b) => Some(*b),
            Flag::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Flag::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            Flag::Text(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: String,
    iss: String,
    aud: Audience,
    exp: i64,
    iat: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<Flag>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    locale: Option<String>,
}

/// Verifies identity tokens minted by the configured OAuth issuer.
pub struct IdentityVerifier {
    key_source: Arc<dyn IssuerKeySource>,
    client_id: String,
    issuers: Vec<String>,
    clock: Arc<dyn Clock>,
    clock_skew: Duration,
}

impl fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("client_id", &self.client_id)
            .field("issuers", &self.issuers)
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl IdentityVerifier {
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` if `client_id` is empty or no
    /// issuer is trusted.
    pub fn new(
        key_source: Arc<dyn IssuerKeySource>,
        client_id: impl Into<String>,
        issuers: Vec<String>,
        clock: Arc<dyn Clock>,
        clock_skew: Duration,
    ) -> Result<Self, AuthError> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(AuthError::Misconfigured(
                "OAuth client id must not be empty".to_string(),
            ));
        }
        if issuers.is_empty() {
            return Err(AuthError::Misconfigured(
                "at least one trusted issuer is required".to_string(),
            ));
        }

        Ok(Self {
            key_source,
            client_id,
            issuers,
            clock,
            clock_skew,
        })
    }

    /// Build a verifier backed by the configured JWKS endpoint.
    ///
    /// # Errors
    ///
    /// See [`IdentityVerifier::new`].
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        Self::new(
            Arc::new(JwksKeySource::from_config(config)),
            config.oauth_client_id.clone(),
            config.oauth_issuers.clone(),
            Arc::new(SystemClock),
            config.clock_skew,
        )
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Verify an external identity token.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - oversized, wrong shape, undecodable
    /// - `AuthError::SignatureInvalid` - unaccepted algorithm, unknown key,
    ///   or bad signature
    /// - `AuthError::IssuerUnreachable` - issuer keys could not be fetched
    /// - `AuthError::IssuerMismatch` - untrusted `iss`
    /// - `AuthError::AudienceMismatch` - `aud` lacks our client id
    /// - `AuthError::Expired` - `now >= exp`
    /// - `AuthError::IssuedInFuture` - `iat` beyond the skew tolerance
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<IdentityAssertion, AuthError> {
        let result = self.verify_inner(token).await;

        match &result {
            Ok(_) => record_identity_verification("success", None),
            Err(e) => {
                tracing::debug!(target: "auth.identity", outcome = e.code(), "Identity token rejected");
                record_identity_verification("error", Some(e.code()));
            }
        }

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<IdentityAssertion, AuthError> {
        check_structure(token)?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "auth.identity", error = %e, "Failed to decode token header");
            AuthError::Malformed
        })?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            tracing::debug!(target: "auth.identity", alg = ?header.alg, "Token algorithm not accepted");
            return Err(AuthError::SignatureInvalid);
        }
        check_signature_encoding(token)?;

        let jwk = self.key_source.find_key(header.kid.as_deref()).await?;
        if !jwk.supports(header.alg) {
            tracing::debug!(
                target: "auth.identity",
                kid = ?header.kid,
                alg = ?header.alg,
                "Issuer key does not match token algorithm"
            );
            return Err(AuthError::SignatureInvalid);
        }
        let key = jwk.decoding_key()?;

        let claims = decode::<IdTokenClaims>(token, &key, &signature_only(header.alg))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(target: "auth.identity", error = %e, "Token verification failed");
                match e.kind() {
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAlgorithm
                    | ErrorKind::InvalidKeyFormat
                    | ErrorKind::InvalidRsaKey(_)
                    | ErrorKind::InvalidEcdsaKey => AuthError::SignatureInvalid,
                    _ => AuthError::Malformed,
                }
            })?;

        if !self.issuers.iter().any(|iss| *iss == claims.iss) {
            tracing::debug!(target: "auth.identity", iss = %claims.iss, "Untrusted issuer");
            return Err(AuthError::IssuerMismatch);
        }

        if !claims.aud.contains(&self.client_id) {
            tracing::debug!(target: "auth.identity", "Token audience does not include client id");
            return Err(AuthError::AudienceMismatch);
        }

        let now = self.clock.now();
        if now >= claims.exp {
            return Err(AuthError::Expired);
        }
        validate_iat_at(claims.iat, self.clock_skew, now)?;

        let email_verified = match &claims.email_verified {
            None => false,
            Some(flag) => flag.as_bool().ok_or_else(|| {
                tracing::debug!(target: "auth.identity", "Unrecognized email_verified value");
                AuthError::Malformed
            })?,
        };

        tracing::debug!(target: "auth.identity", kid = ?header.kid, "Identity token verified");

        Ok(IdentityAssertion {
            subject: claims.sub,
            email: claims.email,
            email_verified,
            given_name: claims.given_name,
            family_name: claims.family_name,
            name: claims.name,
            picture: claims.picture,
            locale: claims.locale,
            issuer: claims.iss,
            audience: self.client_id.clone(),
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Signature check only; claims are checked explicitly against the clock.
fn signature_only(alg: Algorithm) -> Validation {
    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation.leeway = 0;
    validation
}
