//! Logging initialization
//!
//! - Respects the RUST_LOG environment variable (always takes precedence)
//! - Falls back to the configured filter, then to "info"
//! - Respects NO_COLOR
//!
//! # Usage
//!
//! ```rust,no_run
//! use brd_api::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::utils::env::env_opt;

/// Effective filter directive: RUST_LOG, then `filter`, then "info"
fn filter_directive(filter: Option<&str>) -> String {
    env_opt("RUST_LOG").unwrap_or_else(|| filter.unwrap_or("info").to_string())
}

fn resolve_filter(filter: Option<&str>) -> EnvFilter {
    EnvFilter::new(filter_directive(filter))
}

/// Initialize human-readable logging to stderr
///
/// # Arguments
/// * `filter` - Optional log filter from config (e.g., "info", "brd_api=debug").
///   RUST_LOG still takes precedence when set.
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(env_opt("NO_COLOR").is_none()),
        )
        .with(resolve_filter(filter))
        .init();
}

/// Initialize logging with JSON output for log aggregation systems
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(resolve_filter(filter))
        .init();
}

/// Initialize logging from the service's logging config
///
/// JSON output falls back to plain text when the `json-logging` feature is off.
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            tracing::warn!("JSON logging requested but the json-logging feature is disabled");
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
