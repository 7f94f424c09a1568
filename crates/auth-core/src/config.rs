//! Token core configuration.
//!
//! Configuration is loaded from environment variables once at startup. Any
//! problem here is fatal: the services refuse to start rather than fail per
//! request. The signing secret is redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use crate::secret::SecretString;

/// Default session token lifetime (24 hours).
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;

/// Maximum configurable session token lifetime (30 days).
pub const MAX_SESSION_TTL_SECONDS: u64 = 2_592_000;

/// Default issuer key endpoint (Google's OAuth 2.0 JWKS).
pub const DEFAULT_OAUTH_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Default trusted issuers (both forms Google uses in `iss`).
pub const DEFAULT_OAUTH_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Default upper bound for caching issuer keys (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Maximum configurable issuer key cache TTL (24 hours).
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 86_400;

#[derive(Clone)]
pub struct Config {
    /// HS256 secret for session tokens.
    pub session_secret: SecretString,

    /// Session token lifetime.
    pub session_ttl: Duration,

    /// Whether a correctly signed but expired token may be refreshed.
    pub allow_refresh_after_expiry: bool,

    /// Expected `aud` of external identity tokens.
    pub oauth_client_id: String,

    /// Issuer JWKS endpoint.
    pub oauth_jwks_url: String,

    /// Accepted `iss` values.
    pub oauth_issuers: Vec<String>,

    /// Upper bound on how long fetched issuer keys are reused.
    pub jwks_cache_ttl: Duration,

    /// Clock skew tolerance for external `iat` validation.
    pub clock_skew: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("session_secret", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .field("allow_refresh_after_expiry", &self.allow_refresh_after_expiry)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_jwks_url", &self.oauth_jwks_url)
            .field("oauth_issuers", &self.oauth_issuers)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment variable {0} must not be empty")]
    EmptyValue(String),

    #[error("Invalid session token TTL: {0}")]
    InvalidSessionTtl(String),

    #[error("Invalid JWKS cache TTL: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidClockSkew(String),

    #[error("Invalid boolean for {name}: {value}")]
    InvalidBool { name: String, value: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let session_secret = SecretString::from(required(vars, "SESSION_TOKEN_SECRET")?);

        let session_ttl_secs = match vars.get("SESSION_TOKEN_TTL_SECONDS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|e| {
                    ConfigError::InvalidSessionTtl(format!(
                        "SESSION_TOKEN_TTL_SECONDS must be a positive integer, got '{value}': {e}"
                    ))
                })?;
                if secs == 0 || secs > MAX_SESSION_TTL_SECONDS {
                    return Err(ConfigError::InvalidSessionTtl(format!(
                        "SESSION_TOKEN_TTL_SECONDS must be between 1 and {MAX_SESSION_TTL_SECONDS}, got {secs}"
                    )));
                }
                secs
            }
            None => DEFAULT_SESSION_TTL_SECONDS,
        };

        let allow_refresh_after_expiry = match vars.get("SESSION_ALLOW_REFRESH_AFTER_EXPIRY") {
            Some(value) => parse_bool("SESSION_ALLOW_REFRESH_AFTER_EXPIRY", value)?,
            None => false,
        };

        let oauth_client_id = required(vars, "OAUTH_CLIENT_ID")?;

        let oauth_jwks_url = vars
            .get("OAUTH_JWKS_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_OAUTH_JWKS_URL.to_string());

        let oauth_issuers: Vec<String> = match vars.get("OAUTH_ISSUERS") {
            Some(value) => {
                let issuers: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if issuers.is_empty() {
                    return Err(ConfigError::EmptyValue("OAUTH_ISSUERS".to_string()));
                }
                issuers
            }
            None => DEFAULT_OAUTH_ISSUERS.iter().map(ToString::to_string).collect(),
        };

        let jwks_cache_ttl_secs = match vars.get("OAUTH_JWKS_CACHE_TTL_SECONDS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|e| {
                    ConfigError::InvalidJwksCacheTtl(format!(
                        "OAUTH_JWKS_CACHE_TTL_SECONDS must be a positive integer, got '{value}': {e}"
                    ))
                })?;
                if secs == 0 || secs > MAX_JWKS_CACHE_TTL_SECONDS {
                    return Err(ConfigError::InvalidJwksCacheTtl(format!(
                        "OAUTH_JWKS_CACHE_TTL_SECONDS must be between 1 and {MAX_JWKS_CACHE_TTL_SECONDS}, got {secs}"
                    )));
                }
                secs
            }
            None => DEFAULT_JWKS_CACHE_TTL_SECONDS,
        };

        let clock_skew = match vars.get("JWT_CLOCK_SKEW_SECONDS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|e| {
                    ConfigError::InvalidClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must be a positive integer, got '{value}': {e}"
                    ))
                })?;
                if secs == 0 || secs > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must be between 1 and {}, got {secs}",
                        MAX_CLOCK_SKEW.as_secs()
                    )));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_CLOCK_SKEW,
        };

        Ok(Config {
            session_secret,
            session_ttl: Duration::from_secs(session_ttl_secs),
            allow_refresh_after_expiry,
            oauth_client_id,
            oauth_jwks_url,
            oauth_issuers,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            clock_skew,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    let value = vars
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(name.to_string()));
    }

    Ok(value.clone())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
