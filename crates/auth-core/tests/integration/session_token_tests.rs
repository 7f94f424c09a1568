//! Session token lifecycle through the public API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use auth_core::config::Config;
use auth_core::{AuthError, ClaimMap, ClaimValue, ManualClock, TokenService};
use auth_test_utils::*;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::json;

const HOUR: Duration = Duration::from_secs(3600);

fn service() -> (TokenService, Arc<ManualClock>) {
    init_test_tracing();
    let clock = Arc::new(ManualClock::new(TEST_NOW));
    (test_token_service(clock.clone(), HOUR), clock)
}

fn config_vars(extra: &[(&str, &str)]) -> HashMap<String, String> {
    let mut vars = HashMap::from([
        (
            "SESSION_TOKEN_SECRET".to_string(),
            TEST_SESSION_SECRET.to_string(),
        ),
        ("OAUTH_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
    ]);
    for (k, v) in extra {
        vars.insert((*k).to_string(), (*v).to_string());
    }
    vars
}

#[test]
fn test_issued_token_wire_format() {
    let (service, _) = service();
    let claims = ClaimMap::from([
        ("role".to_string(), ClaimValue::from("volunteer")),
        (
            "authorities".to_string(),
            ClaimValue::from(vec!["ROLE_USER", "ROLE_ORGANIZER"]),
        ),
    ]);

    let token = service.issue("user-42", claims).unwrap();

    token
        .assert_valid_jwt()
        .assert_for_subject("user-42")
        .assert_signed_by(service.key_fingerprint())
        .assert_lifetime(TEST_NOW, TEST_NOW + 3600)
        .assert_has_claim("role", json!("volunteer"))
        .assert_has_claim("authorities", json!(["ROLE_USER", "ROLE_ORGANIZER"]));
}

#[test]
fn test_reserved_claims_are_never_overridden() {
    let (service, _) = service();
    let claims = ClaimMap::from([
        ("sub".to_string(), ClaimValue::from("admin")),
        ("exp".to_string(), ClaimValue::from(i64::MAX)),
        ("expiresAt".to_string(), ClaimValue::from(i64::MAX)),
        ("role".to_string(), ClaimValue::from("volunteer")),
    ]);

    let token = service.issue("user-42", claims).unwrap();

    token
        .assert_for_subject("user-42")
        .assert_lifetime(TEST_NOW, TEST_NOW + 3600)
        .assert_lacks_claim("expiresAt");
}

#[test]
fn test_token_expires_with_the_clock() {
    let (service, clock) = service();
    let token = service.issue("user-42", ClaimMap::new()).unwrap();

    clock.advance(Duration::from_secs(3599));
    assert_eq!(service.subject(token.as_str()).unwrap(), "user-42");
    assert_eq!(
        service.remaining_ttl(token.as_str()).unwrap(),
        chrono::Duration::seconds(1)
    );

    clock.advance(Duration::from_secs(1));
    assert_eq!(service.validate(token.as_str()), Err(AuthError::Expired));
    assert!(service.is_expired(token.as_str()));
    assert_eq!(service.subject_unchecked(token.as_str()).unwrap(), "user-42");
}

#[test]
fn test_tokens_do_not_verify_across_secrets() {
    let (service, _) = service();
    let token = service.issue("user-42", ClaimMap::new()).unwrap();

    let vars = config_vars(&[("SESSION_TOKEN_SECRET", "a-completely-different-secret-value")]);
    let config = Config::from_vars(&vars).unwrap();
    let other = TokenService::from_config_with_clock(
        &config,
        Arc::new(ManualClock::new(TEST_NOW)),
    )
    .unwrap();

    assert_ne!(service.key_fingerprint(), other.key_fingerprint());
    assert_eq!(
        other.validate(token.as_str()),
        Err(AuthError::SignatureInvalid)
    );
}

#[test]
fn test_config_driven_service_shares_tokens_with_same_secret() -> anyhow::Result<()> {
    let (service, _) = service();
    let token = service.issue("user-42", ClaimMap::new())?;

    let config = Config::from_vars(&config_vars(&[("SESSION_TOKEN_TTL_SECONDS", "600")]))?;
    let from_config =
        TokenService::from_config_with_clock(&config, Arc::new(ManualClock::new(TEST_NOW)))?;

    assert_eq!(from_config.ttl(), Duration::from_secs(600));
    assert_eq!(from_config.key_fingerprint(), service.key_fingerprint());
    assert_eq!(from_config.validate(token.as_str())?.subject, "user-42");
    Ok(())
}

#[test]
fn test_refresh_policy_from_config() -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::new(TEST_NOW));
    let config = Config::from_vars(&config_vars(&[
        ("SESSION_TOKEN_TTL_SECONDS", "60"),
        ("SESSION_ALLOW_REFRESH_AFTER_EXPIRY", "true"),
    ]))?;
    let service = TokenService::from_config_with_clock(&config, clock.clone())?;

    let token = service.issue("user-42", ClaimMap::new())?;
    clock.advance(Duration::from_secs(120));

    assert!(service.can_refresh(token.as_str()));
    service
        .refresh(token.as_str())?
        .assert_for_subject("user-42")
        .assert_lifetime(TEST_NOW + 120, TEST_NOW + 180);
    Ok(())
}

#[test]
fn test_misconfigured_secret_is_fatal() {
    let err = Config::from_vars(&config_vars(&[("SESSION_TOKEN_SECRET", "")])).unwrap_err();
    let auth_err: AuthError = err.into();
    assert!(matches!(auth_err, AuthError::Misconfigured(_)));
}

#[test]
fn test_validation_metrics() {
    let (service, clock) = service();
    let token = service.issue("user-42", ClaimMap::new()).unwrap();

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    metrics::with_local_recorder(&recorder, || {
        service.validate(token.as_str()).unwrap();
        clock.advance(HOUR);
        let _ = service.validate(token.as_str());
        let _ = service.validate("garbage");
    });

    let mut counts: HashMap<(String, String), u64> = HashMap::new();
    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        if key.key().name() != "auth_token_validations_total" {
            continue;
        }
        let label = |name: &str| {
            key.key()
                .labels()
                .find(|l| l.key() == name)
                .map(|l| l.value().to_string())
                .unwrap_or_default()
        };
        if let DebugValue::Counter(n) = value {
            counts.insert((label("status"), label("error_category")), n);
        }
    }

    assert_eq!(counts.get(&("success".into(), "none".into())), Some(&1));
    assert_eq!(counts.get(&("error".into(), "expired".into())), Some(&1));
    assert_eq!(counts.get(&("error".into(), "malformed".into())), Some(&1));
}
