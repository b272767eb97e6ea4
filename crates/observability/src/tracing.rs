//! Tracing/logging initialization.
//!
//! Job execution logs carry structured fields (`table_id`, `partition`,
//! `index`, `sql`, `elapsed_ms`), so the default output is JSON.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize JSON tracing for the process, configurable via `RUST_LOG`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or(DEFAULT_FILTER))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Initialize plain-text tracing writing through the test harness capture.
pub fn init_pretty(default: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or(default))
        .with_test_writer()
        .try_init();
}
