//! Compact JWT codec for session tokens.
//!
//! Wire format: `base64url(header).base64url(claims).base64url(signature)`
//! with header `{"typ":"JWT","alg":"HS256","kid":<key fingerprint>}`.
//!
//! The codec checks structure and signature only. Expiry is a policy
//! decision that depends on the injected clock, so it lives in
//! [`crate::token_service::TokenService`].

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use std::collections::HashSet;
use std::fmt;
use tracing::instrument;

use crate::claims::ClaimSet;
use crate::errors::AuthError;
use crate::jwt::{check_signature_encoding, check_structure};
use crate::signing_key::SigningKey;

/// A signed session token.
///
/// Immutable once issued. Debug output is redacted because the value is a
/// bearer credential; use [`Token::as_str`] to hand it to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

/// HS256 encoder/decoder bound to one signing key.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: SigningKey,
    validation: Validation,
}

impl TokenCodec {
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time and audience checks are owned by TokenService.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Self { key, validation }
    }

    #[must_use]
    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// Serialize and sign a claim set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` if signing fails, which only
    /// happens when the key material is unusable.
    #[instrument(skip_all)]
    pub fn encode(&self, claims: &ClaimSet) -> Result<Token, AuthError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.key.fingerprint().to_string());

        encode(&header, claims, self.key.encoding_key())
            .map(Token)
            .map_err(|e| {
                tracing::error!(target: "auth.codec", error = %e, "JWT signing operation failed");
                AuthError::Misconfigured("token signing failed".to_string())
            })
    }

    /// Verify the signature and decode the claim set. Does not check expiry.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - oversized, wrong segment count,
    ///   undecodable header/payload, or claims outside the supported shapes
    /// - `AuthError::SignatureInvalid` - signature mismatch or a header
    ///   algorithm other than HS256
    #[instrument(skip_all)]
    pub fn decode(&self, token: &str) -> Result<ClaimSet, AuthError> {
        check_structure(token)?;

        decode_header(token).map_err(|e| {
            tracing::debug!(target: "auth.codec", error = %e, "Token header could not be decoded");
            AuthError::Malformed
        })?;
        check_signature_encoding(token)?;

        decode::<ClaimSet>(token, self.key.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = classify(e.kind());
                tracing::debug!(
                    target: "auth.codec",
                    error = %e,
                    outcome = err.code(),
                    "Token decoding failed"
                );
                err
            })
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        // Algorithm substitution is treated as a forged signature.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed,
    }
}
