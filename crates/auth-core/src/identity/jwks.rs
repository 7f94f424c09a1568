//! JWKS key source for the external OAuth issuer.
//!
//! Fetches the issuer's published keys and caches them for a bounded time.
//! The cache lifetime is the configured TTL, lowered to the upstream
//! `Cache-Control: max-age` when that is smaller, so rotated keys are picked
//! up no later than the issuer asks.
//!
//! Concurrent lookups that miss the cache wait on a single refresh instead
//! of each hitting the issuer.
//!
//! # Security
//!
//! - A fetch failure is reported as `IssuerUnreachable`, never as an
//!   invalid token
//! - An unknown `kid` against a fresh cache does not trigger a refetch, so
//!   forged headers cannot be used to hammer the issuer

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use crate::config::Config;
use crate::errors::AuthError;
use crate::identity::key_source::{IssuerKeySource, Jwk, JwkSet};
use crate::observability::metrics::{record_jwks_fetch, record_jwks_request};

/// HTTP timeout for JWKS fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedJwks {
    keys: JwkSet,
    expires_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Caching JWKS client.
pub struct JwksKeySource {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    /// Held for the duration of a fetch; later waiters re-check the cache.
    refresh_lock: Mutex<()>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for JwksKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeySource")
            .field("jwks_url", &self.jwks_url)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl JwksKeySource {
    /// Create a key source for `jwks_url` with an upper bound on caching.
    #[must_use]
    pub fn new(jwks_url: impl Into<String>, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url: jwks_url.into(),
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.oauth_jwks_url.clone(), config.jwks_cache_ttl)
    }

    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Drop cached keys; the next lookup fetches.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// `None` when there is no fresh cache to answer from.
    async fn lookup_cached(&self, kid: Option<&str>) -> Option<Result<Jwk, AuthError>> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref().filter(|c| c.is_fresh())?;

        Some(cached.keys.select(kid).cloned().ok_or_else(|| {
            tracing::debug!(target: "auth.jwks", kid = ?kid, "Key not found in JWKS cache");
            AuthError::SignatureInvalid
        }))
    }

    #[instrument(skip_all)]
    async fn refresh(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(target: "auth.jwks", url = %self.jwks_url, "Fetching JWKS from issuer");
        let start = Instant::now();

        let result = self.fetch().await;
        record_jwks_fetch(
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        let (keys, max_age) = result?;

        let ttl = effective_ttl(self.cache_ttl, max_age);
        tracing::info!(
            target: "auth.jwks",
            key_count = keys.keys.len(),
            ttl_secs = ttl.as_secs(),
            "JWKS cache refreshed"
        );

        *self.cache.write().await = Some(CachedJwks {
            keys: keys.clone(),
            expires_at: Instant::now().checked_add(ttl).unwrap_or_else(Instant::now),
        });

        Ok(keys)
    }

    async fn fetch(&self) -> Result<(JwkSet, Option<Duration>), AuthError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::IssuerUnreachable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::IssuerUnreachable);
        }

        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age);

        let keys: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(target: "auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::IssuerUnreachable
        })?;

        Ok((keys, max_age))
    }
}

#[async_trait]
impl IssuerKeySource for JwksKeySource {
    #[instrument(skip_all, fields(kid = ?kid))]
    async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        if let Some(result) = self.lookup_cached(kid).await {
            record_jwks_request("hit");
            return result;
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited.
        if let Some(result) = self.lookup_cached(kid).await {
            record_jwks_request("hit");
            return result;
        }

        record_jwks_request("miss");
        let keys = self.refresh().await?;

        keys.select(kid).cloned().ok_or_else(|| {
            tracing::warn!(target: "auth.jwks", kid = ?kid, "Key not found in JWKS after refresh");
            AuthError::SignatureInvalid
        })
    }
}

/// Extract `max-age` seconds from a `Cache-Control` header value.
fn parse_max_age(header: &str) -> Option<Duration> {
    header.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().trim_matches('"').parse().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

fn effective_ttl(configured: Duration, max_age: Option<Duration>) -> Duration {
    max_age.map_or(configured, |upstream| configured.min(upstream))
}
