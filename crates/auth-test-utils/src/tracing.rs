//! Test log output
//!
//! `RUST_LOG=auth=debug cargo test` shows the rejection reasons the crate
//! logs at debug level.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once per process. Later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
