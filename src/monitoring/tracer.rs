/*!
 * Tracing Setup
 * Structured logging for philosopher processes using the tracing crate
 */

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing on stderr
///
/// Stdout is left for `--json` reports.
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PHIL_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("PHIL_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = if use_json {
        // JSON output for collecting several processes' logs
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .try_init()
    };

    if initialized.is_ok() {
        info!(pid = std::process::id(), json = use_json, "tracing initialized");
    }
}
