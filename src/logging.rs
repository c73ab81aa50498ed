//! Tracing subscriber setup.
//!
//! depswap only emits `tracing` events (targets under `depswap::`); whether
//! they go anywhere is up to the embedding test binary. `init_tracing` is a
//! convenience for tests that want to see them.

use tracing_subscriber::EnvFilter;

/// Environment variable read for the filter directive.
pub const LOG_ENV: &str = "DEPSWAP_LOG";

/// Install a compact fmt subscriber filtered by `DEPSWAP_LOG`, falling back
/// to `default_filter`.
///
/// Safe to call more than once: if a global subscriber is already set this
/// returns `false` and changes nothing.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init()
        .is_ok()
}
