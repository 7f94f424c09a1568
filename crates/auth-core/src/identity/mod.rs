//! External OAuth identity verification.
//!
//! Identity tokens are signed by the issuer with an asymmetric key (RS256
//! for Google, EdDSA also accepted) and verified against the issuer's
//! published JWKS. Nothing here shares key material with the session
//! token half of the crate.

pub mod assertion;
pub mod jwks;
pub mod key_source;
pub mod verifier;

pub use assertion::IdentityAssertion;
pub use jwks::JwksKeySource;
pub use key_source::{IssuerKeySource, Jwk, JwkSet, StaticKeySource};
pub use verifier::IdentityVerifier;
