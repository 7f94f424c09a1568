//! Session token claims.
//!
//! Claims are a closed, typed structure rather than an open JSON bag: the
//! three temporal/identity claims are fixed fields and every caller-supplied
//! claim is one of [`ClaimValue`]'s variants. Extra claims live in a
//! `BTreeMap` so that serialization (and therefore the signature) is
//! deterministic for a given claim set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Claim names owned by the token service. Callers can never set these.
///
/// The wire names (`sub`, `iat`, `exp`) are reserved along with their
/// long-form aliases so that a caller-supplied `expiresAt` cannot sit next
/// to the real `exp` and be mistaken for it by a downstream reader.
pub const RESERVED_CLAIMS: [&str; 6] = ["sub", "iat", "exp", "subject", "issuedAt", "expiresAt"];

/// Caller-supplied claims.
pub type ClaimMap = BTreeMap<String, ClaimValue>;

/// A single claim value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    String(String),
    Number(serde_json::Number),
    StringList(Vec<String>),
}

impl ClaimValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ClaimValue::StringList(values) => Some(values),
            _ => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Number(value.into())
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(values: Vec<String>) -> Self {
        ClaimValue::StringList(values)
    }
}

impl From<Vec<&str>> for ClaimValue {
    fn from(values: Vec<&str>) -> Self {
        ClaimValue::StringList(values.into_iter().map(ToString::to_string).collect())
    }
}

/// Validated contents of a session token.
///
/// The `subject` is redacted in Debug output since it is a user identifier.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject (user id).
    #[serde(rename = "sub")]
    pub subject: String,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(rename = "exp")]
    pub expires_at: i64,

    /// Non-reserved claims attached by the caller.
    #[serde(flatten)]
    pub extra: ClaimMap,
}

impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("subject", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ClaimSet {
    /// Build a claim set, dropping any reserved keys from `extra`.
    #[must_use]
    pub fn new(subject: String, issued_at: i64, expires_at: i64, extra: ClaimMap) -> Self {
        Self {
            subject,
            issued_at,
            expires_at,
            extra: strip_reserved(extra),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.extra.get(name)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Time left until expiry; zero or negative once expired.
    ///
    /// Saturates at `chrono::Duration::MAX`/`MIN` for far-off timestamps.
    #[must_use]
    pub fn remaining_at(&self, now: i64) -> chrono::Duration {
        let secs = self.expires_at.saturating_sub(now);
        chrono::Duration::try_seconds(secs).unwrap_or(if secs > 0 {
            chrono::Duration::MAX
        } else {
            chrono::Duration::MIN
        })
    }
}

/// Remove reserved claim names from a caller-supplied map.
#[must_use]
pub fn strip_reserved(mut claims: ClaimMap) -> ClaimMap {
    for name in RESERVED_CLAIMS {
        if claims.remove(name).is_some() {
            tracing::debug!(
                target: "auth.claims",
                claim = name,
                "Dropped caller-supplied reserved claim"
            );
        }
    }
    claims
}
