//! Verified identity extracted from an external token.

use serde::Serialize;
use std::fmt;

/// Identity attested by the external issuer.
///
/// Only produced by a successful verification: `audience` equals the
/// configured client id and `expires_at` was in the future at that time.
/// Subject and email are redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct IdentityAssertion {
    /// Issuer-scoped stable user id (`sub`).
    pub subject: String,
    pub email: Option<String>,
    /// `false` when the issuer did not state it.
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub locale: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl IdentityAssertion {
    /// Full name, falling back to given and family name.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }

        let joined = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or_default(),
            self.family_name.as_deref().unwrap_or_default()
        );
        let joined = joined.trim();

        if joined.is_empty() {
            None
        } else {
            Some(joined.to_string())
        }
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("subject", &"[REDACTED]")
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("email_verified", &self.email_verified)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
