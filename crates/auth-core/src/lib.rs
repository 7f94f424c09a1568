//! Session token issuance/validation and OAuth identity verification.
//!
//! The crate is split into two independent halves that share only the error
//! taxonomy and the clock abstraction:
//!
//! - [`token_service::TokenService`] issues, validates and refreshes HS256
//!   session tokens signed with a configured secret.
//! - [`identity::IdentityVerifier`] verifies identity tokens minted by an
//!   external OAuth issuer against its published keys.
//!
//! # Example
//!
//! ```rust,ignore
//! use auth_core::config::Config;
//! use auth_core::token_service::TokenService;
//! use auth_core::bearer::extract_bearer;
//!
//! let config = Config::from_env()?;
//! let tokens = TokenService::from_config(&config)?;
//!
//! let token = tokens.issue("user-42", ClaimMap::new())?;
//! let presented = extract_bearer(header_value).ok_or(AuthError::Malformed)?;
//! let claims = tokens.validate(presented)?;
//! ```

#![warn(clippy::pedantic)]

/// Bearer token extraction from `Authorization` header values.
pub mod bearer;

/// Typed claim set carried inside session tokens.
pub mod claims;

/// Injectable time source.
pub mod clock;

/// Compact JWT encoding/decoding with the session signing key.
pub mod codec;

/// Environment-driven configuration.
pub mod config;

/// Error taxonomy shared by every operation.
pub mod errors;

/// External OAuth identity token verification.
pub mod identity;

/// Shared JWT limits and header helpers.
pub mod jwt;

/// axum request guard for bearer-authenticated routes.
pub mod middleware;

/// Metrics instrumentation.
pub mod observability;

/// Secret types that prevent accidental logging.
pub mod secret;

/// Symmetric signing key derived from the configured secret.
pub mod signing_key;

/// Session token lifecycle.
pub mod token_service;

pub use claims::{ClaimMap, ClaimSet, ClaimValue};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::AuthError;
pub use identity::{IdentityAssertion, IdentityVerifier, IssuerKeySource};
pub use token_service::{Token, TokenService};
