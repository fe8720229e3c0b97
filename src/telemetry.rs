//! Tracing integration for fast_file_search.
//!
//! Initializes a layered tracing subscriber with a `fmt` layer for
//! human-readable console output, filtered by `RUST_LOG` when set and by the
//! supplied level otherwise. The engine itself only emits `tracing` events;
//! attaching a subscriber is the host's choice.

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the console tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops because a global
/// subscriber may only be installed a single time per process.
pub fn init_logging(log_level: Level) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    // Respect RUST_LOG, falling back to the requested level
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
