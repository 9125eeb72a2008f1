//! Logging initialization with tracing.
//!
//! Layers in this workspace emit construction-time diagnostics at debug level
//! and statistical precondition warnings at warn level; these helpers wire a
//! subscriber up for applications and tests.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
///
/// Reads the log level from the RUST_LOG environment variable (defaults to
/// "info"). Outputs JSON-formatted logs for production monitoring.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,harmonics_nn=info,harmonics_transforms=info".into()
        }))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("structured logging initialized");
}

/// Initialize simple console logging (for examples/debugging).
pub fn init_console_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harmonics_nn=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}
