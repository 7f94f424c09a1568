//! # Auth Test Utilities
//!
//! Shared test utilities for `auth-core` integration tests.
//!
//! This crate provides:
//! - Deterministic issuer keys (seeded Ed25519, fixed RSA) and JWKS documents
//! - An external identity token builder
//! - Fixed test IDs and constants
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! let key = IssuerKey::rsa(TEST_KID_RSA)?;
//! let id_token = IdTokenBuilder::new(TEST_NOW).sign(&key);
//!
//! let session = service.issue(TEST_SUBJECT, ClaimMap::new())?;
//! session.assert_valid_jwt().assert_for_subject(TEST_SUBJECT);
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod test_ids;
pub mod token_builders;
pub mod tracing;

pub use assertions::*;
pub use crypto_fixtures::*;
pub use test_ids::*;
pub use token_builders::*;
pub use tracing::init_test_tracing;
