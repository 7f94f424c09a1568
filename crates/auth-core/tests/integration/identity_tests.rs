//! Identity verification against a mock issuer JWKS endpoint.

use std::sync::Arc;
use std::time::Duration;

use auth_core::identity::{IdentityVerifier, JwksKeySource};
use auth_core::jwt::DEFAULT_CLOCK_SKEW;
use auth_core::{AuthError, ManualClock};
use auth_test_utils::*;
use jsonwebtoken::{Algorithm, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/oauth2/v3/certs";

/// Mock issuer publishing an RSA and an Ed25519 key.
struct TestIssuer {
    server: MockServer,
    rsa: IssuerKey,
    ed25519: IssuerKey,
}

impl TestIssuer {
    async fn start() -> Self {
        init_test_tracing();
        Self {
            server: MockServer::start().await,
            rsa: IssuerKey::rsa(TEST_KID_RSA).unwrap(),
            ed25519: IssuerKey::ed25519(TEST_KID_ED25519, 1).unwrap(),
        }
    }

    fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    fn jwks_response(&self) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(jwks_document(&[&self.rsa, &self.ed25519]))
    }

    async fn publish(&self, response: ResponseTemplate, expected_fetches: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .expect(expected_fetches)
            .mount(&self.server)
            .await;
    }

    fn verifier(&self, clock: Arc<ManualClock>) -> (IdentityVerifier, Arc<JwksKeySource>) {
        let source = Arc::new(JwksKeySource::new(self.jwks_url(), Duration::from_secs(300)));
        let verifier = IdentityVerifier::new(
            source.clone(),
            TEST_CLIENT_ID,
            vec![TEST_ISSUER_BARE.to_string(), TEST_ISSUER.to_string()],
            clock,
            DEFAULT_CLOCK_SKEW,
        )
        .unwrap();
        (verifier, source)
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(TEST_NOW))
}

#[tokio::test]
async fn test_rs256_google_token_verifies() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    let token = IdTokenBuilder::new(TEST_NOW - 10).sign(&issuer.rsa);
    let identity = verifier.verify(&token).await.unwrap();

    assert_eq!(identity.subject, TEST_SUBJECT);
    assert_eq!(identity.email.as_deref(), Some(TEST_EMAIL));
    assert!(identity.email_verified);
    assert_eq!(identity.display_name().as_deref(), Some("Ada Lovelace"));
    assert_eq!(identity.audience, TEST_CLIENT_ID);
    assert_eq!(identity.issuer, TEST_ISSUER);
}

#[tokio::test]
async fn test_eddsa_token_verifies() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    let token = IdTokenBuilder::new(TEST_NOW)
        .issuer(TEST_ISSUER_BARE)
        .sign(&issuer.ed25519);
    let identity = verifier.verify(&token).await.unwrap();

    assert_eq!(identity.issuer, TEST_ISSUER_BARE);
}

#[tokio::test]
async fn test_keys_are_cached_between_verifications() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    for _ in 0..3 {
        let token = IdTokenBuilder::new(TEST_NOW).sign(&issuer.rsa);
        verifier.verify(&token).await.unwrap();
    }
    let token = IdTokenBuilder::new(TEST_NOW).sign(&issuer.ed25519);
    verifier.verify(&token).await.unwrap();
}

#[tokio::test]
async fn test_upstream_max_age_bounds_cache_lifetime() {
    let issuer = TestIssuer::start().await;
    issuer
        .publish(
            issuer
                .jwks_response()
                .insert_header("cache-control", "public, max-age=0, must-revalidate"),
            2,
        )
        .await;
    let (verifier, _) = issuer.verifier(clock());

    let token = IdTokenBuilder::new(TEST_NOW).sign(&issuer.rsa);
    verifier.verify(&token).await.unwrap();
    verifier.verify(&token).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() {
    let issuer = TestIssuer::start().await;
    issuer
        .publish(
            issuer.jwks_response().set_delay(Duration::from_millis(200)),
            1,
        )
        .await;
    let (verifier, _) = issuer.verifier(clock());
    let verifier = Arc::new(verifier);
    let token = IdTokenBuilder::new(TEST_NOW).sign(&issuer.rsa);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let token = token.clone();
            tokio::spawn(async move { verifier.verify(&token).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn test_issuer_error_is_unreachable_not_invalid() {
    let issuer = TestIssuer::start().await;
    issuer.publish(ResponseTemplate::new(500), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    let token = IdTokenBuilder::new(TEST_NOW).sign(&issuer.rsa);
    let err = verifier.verify(&token).await.unwrap_err();

    assert_eq!(err, AuthError::IssuerUnreachable);
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn test_garbage_jwks_is_unreachable() {
    let issuer = TestIssuer::start().await;
    issuer
        .publish(ResponseTemplate::new(200).set_body_string("<html>oops</html>"), 1)
        .await;
    let (verifier, _) = issuer.verifier(clock());

    let token = IdTokenBuilder::new(TEST_NOW).sign(&issuer.rsa);
    assert_eq!(
        verifier.verify(&token).await,
        Err(AuthError::IssuerUnreachable)
    );
}

#[tokio::test]
async fn test_malformed_token_never_reaches_issuer() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 0).await;
    let (verifier, _) = issuer.verifier(clock());

    assert_eq!(
        verifier.verify("not.a-jwt").await,
        Err(AuthError::Malformed)
    );

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID_RSA.to_string());
    let hs_token = jsonwebtoken::encode(
        &header,
        &IdTokenBuilder::new(TEST_NOW).claims(),
        &jsonwebtoken::EncodingKey::from_secret(b"attacker"),
    )
    .unwrap();
    assert_eq!(
        verifier.verify(&hs_token).await,
        Err(AuthError::SignatureInvalid)
    );
}

#[tokio::test]
async fn test_changed_signature_is_signature_invalid_for_both_key_types() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    for key in [&issuer.rsa, &issuer.ed25519] {
        let token = IdTokenBuilder::new(TEST_NOW).sign(key);
        assert!(verifier.verify(&token).await.is_ok());

        let (signed, signature) = token.rsplit_once('.').unwrap();
        let last = signature.len() - 1;
        for (position, replacement) in [(0, 'A'), (0, 'B'), (last, 'A'), (last, 'B'), (last, 'w')] {
            let mut changed = signature.to_string();
            changed.replace_range(position..=position, &replacement.to_string());
            if changed == signature {
                continue;
            }

            assert_eq!(
                verifier.verify(&format!("{signed}.{changed}")).await,
                Err(AuthError::SignatureInvalid),
                "{:?} position {position} -> {replacement}",
                key.algorithm()
            );
        }
    }
}

#[tokio::test]
async fn test_key_type_must_match_header_algorithm() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    // EdDSA signature presented under the RSA key's kid.
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(TEST_KID_RSA.to_string());
    let token = issuer
        .ed25519
        .sign_with_header(&header, &IdTokenBuilder::new(TEST_NOW).claims());

    assert_eq!(
        verifier.verify(&token).await,
        Err(AuthError::SignatureInvalid)
    );
}

#[tokio::test]
async fn test_claim_checks() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    let cases = [
        (
            IdTokenBuilder::new(TEST_NOW).audience("other.apps.googleusercontent.com"),
            AuthError::AudienceMismatch,
        ),
        (
            IdTokenBuilder::new(TEST_NOW).issuer("https://accounts.example.com"),
            AuthError::IssuerMismatch,
        ),
        (
            IdTokenBuilder::new(TEST_NOW - 3600),
            AuthError::Expired,
        ),
        (
            IdTokenBuilder::new(TEST_NOW + 301),
            AuthError::IssuedInFuture,
        ),
        (IdTokenBuilder::new(TEST_NOW).without("sub"), AuthError::Malformed),
        (
            IdTokenBuilder::new(TEST_NOW).email_verified(json!("sometimes")),
            AuthError::Malformed,
        ),
    ];

    for (builder, expected) in cases {
        let token = builder.sign(&issuer.rsa);
        assert_eq!(
            verifier.verify(&token).await,
            Err(expected.clone()),
            "expected {expected:?}"
        );
    }
}

#[tokio::test]
async fn test_audience_list_and_string_email_verified() {
    let issuer = TestIssuer::start().await;
    issuer.publish(issuer.jwks_response(), 1).await;
    let (verifier, _) = issuer.verifier(clock());

    let token = IdTokenBuilder::new(TEST_NOW)
        .audiences(&["another-client", TEST_CLIENT_ID])
        .email_verified(json!("false"))
        .sign(&issuer.rsa);
    let identity = verifier.verify(&token).await.unwrap();

    assert!(!identity.email_verified);
    assert_eq!(identity.audience, TEST_CLIENT_ID);
}

#[tokio::test]
async fn test_rotated_key_is_picked_up_after_cache_expiry() {
    let issuer = TestIssuer::start().await;
    let rotated = IssuerKey::ed25519("rotated-key-02", 2).unwrap();

    // First fetch publishes only the RSA key; the second adds the rotated key.
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(&[&issuer.rsa])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&issuer.server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(jwks_document(&[&issuer.rsa, &rotated])),
        )
        .expect(1)
        .mount(&issuer.server)
        .await;

    let (verifier, source) = issuer.verifier(clock());
    verifier
        .verify(&IdTokenBuilder::new(TEST_NOW).sign(&issuer.rsa))
        .await
        .unwrap();

    // Fresh cache: an unknown kid is rejected without refetching.
    let rotated_token = IdTokenBuilder::new(TEST_NOW).sign(&rotated);
    assert_eq!(
        verifier.verify(&rotated_token).await,
        Err(AuthError::SignatureInvalid)
    );

    source.invalidate().await;
    assert!(verifier.verify(&rotated_token).await.is_ok());
}
