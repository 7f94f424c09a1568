//! Session token lifecycle: issue, validate, inspect and refresh.
//!
//! Token states:
//!
//! ```text
//! issue ──► Valid (now < exp, signature verifies) ──► Expired (now >= exp)
//!             │
//!             └── refresh ──► new token, fresh iat/exp, same subject/claims
//! ```
//!
//! Every operation is a pure function of the token, the signing key and the
//! injected clock. The service holds no mutable state and is shared across
//! request handlers behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::claims::{ClaimMap, ClaimSet};
use crate::clock::{duration_secs, Clock, SystemClock};
use crate::codec::TokenCodec;
use crate::config::Config;
use crate::errors::AuthError;
use crate::observability::metrics::{record_token_issued, record_token_validation};
use crate::signing_key::SigningKey;

pub use crate::codec::Token;

/// Issues and validates HS256 session tokens.
pub struct TokenService {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    allow_refresh_after_expiry: bool,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", self.codec.key())
            .field("ttl", &self.ttl)
            .field("allow_refresh_after_expiry", &self.allow_refresh_after_expiry)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a service that refuses to refresh expired tokens.
    #[must_use]
    pub fn new(key: SigningKey, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec: TokenCodec::new(key),
            clock,
            ttl,
            allow_refresh_after_expiry: false,
        }
    }

    /// Allow (or forbid) refreshing a correctly signed but expired token.
    #[must_use]
    pub fn with_refresh_after_expiry(mut self, allow: bool) -> Self {
        self.allow_refresh_after_expiry = allow;
        self
    }

    /// Build from configuration using the wall clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` if the signing secret is unusable.
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    /// Build from configuration with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` if the signing secret is unusable.
    pub fn from_config_with_clock(
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let key = SigningKey::from_secret(&config.session_secret)?;
        Ok(Self::new(key, config.session_ttl, clock)
            .with_refresh_after_expiry(config.allow_refresh_after_expiry))
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn key_fingerprint(&self) -> &str {
        self.codec.key().fingerprint()
    }

    /// Issue a token for `subject` carrying `claims`.
    ///
    /// `iat`/`exp`/`sub` (and their long-form aliases) in `claims` are
    /// dropped; the service alone decides identity and lifetime.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - empty subject
    /// - `AuthError::Misconfigured` - signing failed
    #[instrument(skip_all)]
    pub fn issue(&self, subject: &str, claims: ClaimMap) -> Result<Token, AuthError> {
        let token = self.mint(subject, claims)?;
        record_token_issued("issue");
        tracing::debug!(target: "auth.token", ttl_secs = self.ttl.as_secs(), "Session token issued");
        Ok(token)
    }

    /// Verify signature and expiry, returning the full claim set.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - not a well-formed token
    /// - `AuthError::SignatureInvalid` - signature does not match
    /// - `AuthError::Expired` - `now >= exp`
    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let result = self.check(token);
        match &result {
            Ok(_) => record_token_validation("success", None),
            Err(e) => record_token_validation("error", Some(e.code())),
        }
        result
    }

    /// Subject of a valid (signed, unexpired) token.
    ///
    /// # Errors
    ///
    /// Same as [`TokenService::validate`].
    pub fn subject(&self, token: &str) -> Result<String, AuthError> {
        self.validate(token).map(|claims| claims.subject)
    }

    /// Subject of a correctly signed token, **ignoring expiry**.
    ///
    /// For display purposes only (e.g. "welcome back" on a lapsed session).
    /// Never use the result to authorize anything.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - not a well-formed token
    /// - `AuthError::SignatureInvalid` - signature does not match
    pub fn subject_unchecked(&self, token: &str) -> Result<String, AuthError> {
        self.codec.decode(token).map(|claims| claims.subject)
    }

    /// True when the token is past expiry or cannot be trusted at all.
    #[must_use]
    pub fn is_expired(&self, token: &str) -> bool {
        match self.codec.decode(token) {
            Ok(claims) => claims.is_expired_at(self.clock.now()),
            Err(_) => true,
        }
    }

    /// `exp - now` of a correctly signed token; zero or negative once expired.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - not a well-formed token
    /// - `AuthError::SignatureInvalid` - signature does not match
    pub fn remaining_ttl(&self, token: &str) -> Result<chrono::Duration, AuthError> {
        let claims = self.codec.decode(token)?;
        Ok(claims.remaining_at(self.clock.now()))
    }

    /// Re-issue a token with fresh timestamps and the same subject/claims.
    ///
    /// The presented token must carry a valid signature. An expired token is
    /// only accepted when the service was built with
    /// `with_refresh_after_expiry(true)`.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - not a well-formed token
    /// - `AuthError::SignatureInvalid` - signature does not match
    /// - `AuthError::Expired` - expired and refresh-after-expiry is disabled
    #[instrument(skip_all)]
    pub fn refresh(&self, token: &str) -> Result<Token, AuthError> {
        let claims = self.refreshable_claims(token)?;
        let refreshed = self.mint(&claims.subject, claims.extra)?;
        record_token_issued("refresh");
        tracing::debug!(target: "auth.token", "Session token refreshed");
        Ok(refreshed)
    }

    /// Whether [`TokenService::refresh`] would accept this token.
    #[must_use]
    pub fn can_refresh(&self, token: &str) -> bool {
        self.refreshable_claims(token).is_ok()
    }

    fn mint(&self, subject: &str, claims: ClaimMap) -> Result<Token, AuthError> {
        if subject.is_empty() {
            tracing::debug!(target: "auth.token", "Refusing to issue token for empty subject");
            return Err(AuthError::Malformed);
        }

        let now = self.clock.now();
        let expires_at = now.saturating_add(duration_secs(self.ttl));
        let claim_set = ClaimSet::new(subject.to_string(), now, expires_at, claims);

        self.codec.encode(&claim_set)
    }

    fn check(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let claims = self.codec.decode(token)?;
        let now = self.clock.now();

        if claims.is_expired_at(now) {
            tracing::debug!(
                target: "auth.token",
                exp = claims.expires_at,
                now = now,
                "Token rejected: expired"
            );
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    fn refreshable_claims(&self, token: &str) -> Result<ClaimSet, AuthError> {
        if self.allow_refresh_after_expiry {
            self.codec.decode(token)
        } else {
            self.check(token)
        }
    }
}
