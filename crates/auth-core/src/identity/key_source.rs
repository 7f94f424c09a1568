//! Issuer public keys.
//!
//! Verifying an external identity token needs the issuer's current public
//! keys. [`IssuerKeySource`] is that capability; [`super::jwks::JwksKeySource`]
//! fetches it over HTTPS and [`StaticKeySource`] serves a fixed set.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// JSON Web Key as published by the issuer.
///
/// Only two forms are usable: `kty=RSA` with `n`/`e`, and `kty=OKP` with
/// `crv=Ed25519` and `x`. Anything else is kept in the set but never
/// selected for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID matched against the token header `kid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Algorithm the key is restricted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// OKP curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// OKP public key (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

impl Jwk {
    /// Whether this key may verify a token signed with `alg`.
    ///
    /// The key type must match the algorithm family, and a key that
    /// declares its own `alg` must declare the same one.
    #[must_use]
    pub fn supports(&self, alg: Algorithm) -> bool {
        let family_matches = match alg {
            Algorithm::RS256 => self.kty == "RSA",
            Algorithm::EdDSA => self.kty == "OKP" && self.crv.as_deref() == Some("Ed25519"),
            _ => false,
        };

        let declared_matches = match self.alg.as_deref() {
            None => true,
            Some("RS256") => alg == Algorithm::RS256,
            Some("EdDSA") => alg == Algorithm::EdDSA,
            Some(_) => false,
        };

        let usable_for_signing = self.key_use.as_deref().map_or(true, |u| u == "sig");

        family_matches && declared_matches && usable_for_signing
    }

    /// Build the verification key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SignatureInvalid` if the key is missing its
    /// components or they are not valid base64url.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        let key = match self.kty.as_str() {
            "RSA" => match (self.n.as_deref(), self.e.as_deref()) {
                (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e).ok(),
                _ => None,
            },
            "OKP" => self
                .x
                .as_deref()
                .and_then(|x| DecodingKey::from_ed_components(x).ok()),
            _ => None,
        };

        key.ok_or_else(|| {
            tracing::warn!(
                target: "auth.identity",
                kid = ?self.kid,
                kty = %self.kty,
                "Issuer key has unusable key material"
            );
            AuthError::SignatureInvalid
        })
    }
}

/// JWKS document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Pick the key for a token header `kid`.
    ///
    /// Without a `kid`, a set with exactly one key is unambiguous.
    #[must_use]
    pub fn select(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None => match self.keys.as_slice() {
                [only] => Some(only),
                _ => None,
            },
        }
    }
}

/// Source of issuer public keys.
#[async_trait]
pub trait IssuerKeySource: Send + Sync {
    /// Return the key for `kid`.
    ///
    /// # Errors
    ///
    /// - `AuthError::IssuerUnreachable` - keys could not be obtained
    /// - `AuthError::SignatureInvalid` - no key matches `kid`
    async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError>;
}

/// Fixed key set, for tests and deployments with pinned keys.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySource {
    keys: JwkSet,
}

impl StaticKeySource {
    #[must_use]
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self {
            keys: JwkSet { keys },
        }
    }

    /// Parse a JWKS document.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` if `json` is not a JWKS document.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let keys: JwkSet = serde_json::from_str(json)
            .map_err(|e| AuthError::Misconfigured(format!("invalid JWKS document: {e}")))?;
        Ok(Self { keys })
    }
}

#[async_trait]
impl IssuerKeySource for StaticKeySource {
    async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        self.keys.select(kid).cloned().ok_or_else(|| {
            tracing::debug!(target: "auth.identity", kid = ?kid, "No static key matches kid");
            AuthError::SignatureInvalid
        })
    }
}
