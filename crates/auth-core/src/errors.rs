//! Error taxonomy for token and identity operations.
//!
//! Display messages are deliberately generic: they are safe to return to
//! clients and never echo token contents. The specific cause is logged at
//! debug level by the module that detected it.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Structurally invalid input (segment count, encoding, claim shapes, size).
    #[error("The token is malformed")]
    Malformed,

    /// Signature does not verify, or no trusted key can verify it.
    #[error("The token signature is invalid")]
    SignatureInvalid,

    /// `now >= exp`.
    #[error("The token has expired")]
    Expired,

    /// External token was issued for a different client.
    #[error("The token was not issued for this application")]
    AudienceMismatch,

    /// External token was issued by an authority we do not trust.
    #[error("The token was issued by an untrusted issuer")]
    IssuerMismatch,

    /// External token `iat` lies beyond the clock skew tolerance.
    #[error("The token is not yet valid")]
    IssuedInFuture,

    /// Issuer key material could not be fetched.
    #[error("Identity provider unavailable")]
    IssuerUnreachable,

    /// Startup-time configuration problem.
    #[error("Configuration error: {0}")]
    Misconfigured(String),
}

impl AuthError {
    /// HTTP status a request handler should answer with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Malformed
            | AuthError::SignatureInvalid
            | AuthError::Expired
            | AuthError::AudienceMismatch
            | AuthError::IssuerMismatch
            | AuthError::IssuedInFuture => StatusCode::UNAUTHORIZED,
            AuthError::IssuerUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, also used as a bounded metrics label.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::Expired => "expired",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::IssuedInFuture => "issued_in_future",
            AuthError::IssuerUnreachable => "issuer_unreachable",
            AuthError::Misconfigured(_) => "misconfigured",
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::Misconfigured(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Configuration details stay in the server logs.
        let message = match &self {
            AuthError::Misconfigured(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_uppercase(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
