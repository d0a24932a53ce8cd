//! Logging module
//!
//! Diagnostic logging goes through `tracing`. The human-readable action
//! trail that operators keep next to their scripts goes through the
//! [`ActivityLog`] trait so it can be swapped for a capturing sink in tests.

pub mod activity;

pub use activity::*;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
pub fn init_tracing(debug: bool, no_color: bool) {
    let default_filter = if debug { "blobctl=debug" } else { "blobctl=info" };

    // A second init (e.g. from tests) is not an error worth surfacing
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color),
        )
        .try_init();
}
