//! Diagnostic tracing for both binaries.
//!
//! Output goes to stderr and is filtered by `RUST_LOG`. The doctor's step
//! report is plain stdout and is unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to `default_directive` (e.g. `"info"`) if unset
/// or unparsable. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=sdbl=debug sdbl local 2024-01-31
/// ```
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
