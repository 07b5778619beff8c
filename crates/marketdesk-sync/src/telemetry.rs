//! # Telemetry
//!
//! Tracing subscriber setup for binaries built on this crate.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the host's job.

use tracing_subscriber::EnvFilter;

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,marketdesk=debug,reqwest=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages everywhere
/// - `RUST_LOG=marketdesk_sync=trace` - Trace the engine only
/// - Default: [`DEFAULT_FILTER`]
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
