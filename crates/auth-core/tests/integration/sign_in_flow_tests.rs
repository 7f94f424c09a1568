//! Sign-in flow: external identity token in, session token out, session
//! token accepted by a guarded route.

use std::sync::Arc;
use std::time::Duration;

use auth_core::bearer::extract_bearer;
use auth_core::identity::{IdentityVerifier, StaticKeySource};
use auth_core::jwt::DEFAULT_CLOCK_SKEW;
use auth_core::middleware::{require_session, SessionAuthState};
use auth_core::{AuthError, ClaimMap, ClaimSet, ClaimValue, ManualClock, TokenService};
use auth_test_utils::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{Extension, Router};
use http_body_util::BodyExt;
use tower::ServiceExt;

struct Backend {
    verifier: IdentityVerifier,
    sessions: Arc<TokenService>,
    clock: Arc<ManualClock>,
}

impl Backend {
    fn new(issuer: &IssuerKey) -> Self {
        init_test_tracing();
        let clock = Arc::new(ManualClock::new(TEST_NOW));
        let verifier = IdentityVerifier::new(
            Arc::new(StaticKeySource::new(vec![issuer.jwk().clone()])),
            TEST_CLIENT_ID,
            vec![TEST_ISSUER.to_string()],
            clock.clone(),
            DEFAULT_CLOCK_SKEW,
        )
        .unwrap();
        let sessions = Arc::new(test_token_service(clock.clone(), Duration::from_secs(900)));

        Self {
            verifier,
            sessions,
            clock,
        }
    }

    /// Exchange an external identity token for a session token.
    async fn sign_in(&self, id_token: &str) -> Result<String, AuthError> {
        let identity = self.verifier.verify(id_token).await?;

        let mut claims = ClaimMap::new();
        if let Some(email) = identity.email.clone() {
            claims.insert("email".to_string(), ClaimValue::from(email));
        }
        if let Some(name) = identity.display_name() {
            claims.insert("name".to_string(), ClaimValue::from(name));
        }

        let token = self.sessions.issue(&identity.subject, claims)?;
        Ok(token.into_string())
    }

    fn router(&self) -> Router {
        let state = Arc::new(SessionAuthState::new(self.sessions.clone()));
        Router::new()
            .route(
                "/api/me",
                get(|Extension(claims): Extension<ClaimSet>| async move {
                    let email = claims
                        .get("email")
                        .and_then(ClaimValue::as_str)
                        .unwrap_or_default()
                        .to_string();
                    format!("{} {}", claims.subject, email)
                }),
            )
            .layer(axum::middleware::from_fn_with_state(state, require_session))
    }
}

fn me(authorization: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_sign_in_then_call_guarded_route() {
    let issuer = IssuerKey::rsa(TEST_KID_RSA).unwrap();
    let backend = Backend::new(&issuer);

    let id_token = IdTokenBuilder::new(TEST_NOW).sign(&issuer);
    let session = backend.sign_in(&id_token).await.unwrap();
    session
        .assert_valid_jwt()
        .assert_for_subject(TEST_SUBJECT)
        .assert_has_claim("name", serde_json::json!("Ada Lovelace"));

    let header_value = format!("bearer  {session} ");
    assert_eq!(extract_bearer(&header_value), Some(session.as_str()));

    let response = backend
        .router()
        .oneshot(me(&header_value))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        String::from_utf8(body.to_vec()).unwrap(),
        format!("{TEST_SUBJECT} {TEST_EMAIL}")
    );
}

#[tokio::test]
async fn test_external_token_is_not_a_session_token() {
    let issuer = IssuerKey::rsa(TEST_KID_RSA).unwrap();
    let backend = Backend::new(&issuer);

    let id_token = IdTokenBuilder::new(TEST_NOW).sign(&issuer);
    let response = backend
        .router()
        .oneshot(me(&format!("Bearer {id_token}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_lapses_and_refresh_is_denied() {
    let issuer = IssuerKey::ed25519(TEST_KID_ED25519, 4).unwrap();
    let backend = Backend::new(&issuer);

    let session = backend
        .sign_in(&IdTokenBuilder::new(TEST_NOW).sign(&issuer))
        .await
        .unwrap();

    backend.clock.advance(Duration::from_secs(900));

    let response = backend
        .router()
        .oneshot(me(&format!("Bearer {session}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(backend.sessions.refresh(&session), Err(AuthError::Expired));
    assert_eq!(
        backend.sessions.subject_unchecked(&session).unwrap(),
        TEST_SUBJECT
    );
}

#[tokio::test]
async fn test_rejected_identity_issues_nothing() {
    let issuer = IssuerKey::rsa(TEST_KID_RSA).unwrap();
    let backend = Backend::new(&issuer);

    let wrong_audience = IdTokenBuilder::new(TEST_NOW)
        .audience("someone-else")
        .sign(&issuer);

    assert_eq!(
        backend.sign_in(&wrong_audience).await,
        Err(AuthError::AudienceMismatch)
    );
}

#[tokio::test]
async fn test_backend_wiring_from_config() -> anyhow::Result<()> {
    let vars = std::collections::HashMap::from([
        (
            "SESSION_TOKEN_SECRET".to_string(),
            TEST_SESSION_SECRET.to_string(),
        ),
        ("OAUTH_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
        (
            "OAUTH_JWKS_URL".to_string(),
            "http://127.0.0.1:9/certs".to_string(),
        ),
    ]);
    let config = auth_core::config::Config::from_vars(&vars)?;

    let sessions = TokenService::from_config(&config)?;
    let verifier = IdentityVerifier::from_config(&config)?;
    assert_eq!(verifier.client_id(), TEST_CLIENT_ID);

    let token = sessions.issue(TEST_SUBJECT, ClaimMap::new())?;
    assert_eq!(sessions.subject(token.as_str())?, TEST_SUBJECT);
    assert!(sessions.remaining_ttl(token.as_str())? > chrono::Duration::hours(23));

    // Nothing listens on the configured JWKS port.
    let issuer = IssuerKey::rsa(TEST_KID_RSA)?;
    let id_token = IdTokenBuilder::new(chrono::Utc::now().timestamp()).sign(&issuer);
    assert_eq!(
        verifier.verify(&id_token).await,
        Err(AuthError::IssuerUnreachable)
    );
    Ok(())
}
