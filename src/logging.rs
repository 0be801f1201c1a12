//! Logging initialization.
//!
//! Uses `tracing` with either human-readable or JSON output on stderr.
//! `RUST_LOG` overrides the level chosen here.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `verbose` selects DEBUG instead of INFO for this crate and the HTTP trace
/// layer; dependencies stay at their defaults.
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose {
        "crop_disease_detector=debug,tower_http=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
