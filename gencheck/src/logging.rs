//! Tracing setup for the harness.
//!
//! Diagnostic snapshots and diffs are emitted as `info` events, so the default
//! filter keeps them visible. Everything goes to stderr; stdout is reserved for
//! the generator's forwarded output and command results.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "gencheck=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to `gencheck=info` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=gencheck=debug gencheck verify
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
