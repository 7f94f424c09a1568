//! Observability for the token core.
//!
//! Logging uses `tracing` with one `target:` per module (`auth.token`,
//! `auth.codec`, `auth.identity`, `auth.jwks`, `auth.middleware`, ...).
//! Public operations are annotated with `#[instrument(skip_all)]` and add
//! only safe fields explicitly.
//!
//! # Never logged
//!
//! - Token strings (session or external)
//! - The signing secret
//! - Subjects and email addresses
//!
//! Key fingerprints and `kid` values are safe.

pub mod metrics;

pub use metrics::{
    record_identity_verification, record_jwks_fetch, record_jwks_request, record_token_issued,
    record_token_validation,
};
