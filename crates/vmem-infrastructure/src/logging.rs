//! Structured logging with tracing.
//!
//! One global subscriber per process; the filter comes from configuration
//! with `RUST_LOG` taking precedence when set.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialise the global tracing subscriber. Safe to call once; later
/// calls are no-ops (the first subscriber wins).
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialised");
    }
}
