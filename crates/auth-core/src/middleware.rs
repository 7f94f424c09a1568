//! Session authentication guard for axum routes.
//!
//! Extracts the bearer credential, validates it with the [`TokenService`],
//! and injects the resulting [`ClaimSet`] into request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use crate::bearer::bearer_from_headers;
use crate::claims::ClaimSet;
use crate::errors::AuthError;
use crate::token_service::TokenService;

/// State for the session guard.
#[derive(Clone, Debug)]
pub struct SessionAuthState {
    pub token_service: Arc<TokenService>,
}

impl SessionAuthState {
    #[must_use]
    pub fn new(token_service: Arc<TokenService>) -> Self {
        Self { token_service }
    }
}

/// Middleware that rejects requests without a valid session token.
///
/// # Response
///
/// - 401 with `WWW-Authenticate: Bearer` if the credential is missing,
///   malformed, forged or expired
/// - otherwise the request continues with the claims in extensions
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(state, require_session));
/// ```
#[instrument(skip_all, name = "auth.middleware.session")]
pub async fn require_session(
    State(state): State<Arc<SessionAuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let token = bearer_from_headers(req.headers()).ok_or_else(|| {
        tracing::debug!(target: "auth.middleware", "Missing or non-bearer Authorization header");
        AuthError::Malformed
    })?;

    let claims = state.token_service.validate(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Access the authenticated claims from a request.
pub trait ClaimsExt {
    /// `None` if [`require_session`] was not applied to this request.
    fn session_claims(&self) -> Option<&ClaimSet>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn session_claims(&self) -> Option<&ClaimSet> {
        self.extensions().get::<ClaimSet>()
    }
}
