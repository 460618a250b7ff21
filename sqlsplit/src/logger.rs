//! Logging setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Configure logging for the process.
///
/// Respects `RUST_LOG`; defaults to `info`.
pub fn setup() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
