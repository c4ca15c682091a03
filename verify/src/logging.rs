//! Development-time tracing for debugging verification passes.
//!
//! Verifier dispatch logs at `debug`; failure dumps (request/response
//! state) are written at `warn` before a failure is raised. Output goes to
//! stderr and is controlled by `RUST_LOG`; it is not part of the harness's
//! captured result artifacts.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
