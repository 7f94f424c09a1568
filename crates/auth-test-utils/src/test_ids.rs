//! Fixed identifiers for reproducible tests

/// Fixed "now" for clock-driven tests (2023-11-14T22:13:20Z).
pub const TEST_NOW: i64 = 1_700_000_000;

/// Session signing secret (32 bytes).
pub const TEST_SESSION_SECRET: &str = "test-session-secret-0123456789ab";

/// OAuth client id the verifier is configured with.
pub const TEST_CLIENT_ID: &str = "1234567890-test.apps.googleusercontent.com";

/// Trusted issuer, URL form.
pub const TEST_ISSUER: &str = "https://accounts.google.com";

/// Trusted issuer, bare host form.
pub const TEST_ISSUER_BARE: &str = "accounts.google.com";

/// External subject (Google account id shape).
pub const TEST_SUBJECT: &str = "110169484474386276334";

pub const TEST_EMAIL: &str = "ada.lovelace@example.com";

pub const TEST_KID_RSA: &str = "test-rsa-key-01";

pub const TEST_KID_ED25519: &str = "test-ed25519-key-01";
