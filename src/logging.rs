//! Logging and tracing configuration for docid
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! embedding application's choice. `init()` is a ready-made one, and
//! `init_from_config` honours the `log_filter` of a [`DocIdConfig`].
//!
//! # Log Levels
//!
//! - `warn`  - Soft failures that were folded into a default answer
//! - `info`  - Configuration loaded or saved, work timings
//! - `debug` - Classification and encryption decisions (default in debug builds)
//! - `trace` - Header bytes of unknown files, resolved lineage
//!
//! # Filter Precedence
//!
//! 1. `RUST_LOG`, when set and valid
//! 2. the filter passed in (or `log_filter` from the config)
//! 3. `docid=debug` in debug builds, `docid=info` in release
//!
//! ```bash
//! RUST_LOG=docid=trace                 # Everything from this crate
//! RUST_LOG=docid::office=debug,warn    # Encryption decisions, warnings elsewhere
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::DocIdConfig;

/// Output layout of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, no file or thread details
    Compact,
    /// Multi-line events with file:line and thread ids
    Pretty,
}

/// Filter used when neither `RUST_LOG` nor a caller filter is given
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "docid=debug"
    } else {
        "docid=info"
    }
}

fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(default_filter()))
}

/// Install a global subscriber; returns `false` if one was already set
pub fn init_with(format: LogFormat, fallback_filter: &str) -> bool {
    let filter = build_filter(fallback_filter);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            ),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty(),
            ),
        ),
    };
    installed.is_ok()
}

/// Install the compact subscriber (verbose with the `debug-logging` feature)
pub fn init() {
    if cfg!(feature = "debug-logging") {
        init_verbose();
    } else {
        init_with(LogFormat::Compact, default_filter());
    }
}

/// Install the pretty subscriber, tracing this crate by default
pub fn init_verbose() {
    init_with(LogFormat::Pretty, "docid=trace");
}

/// Install the compact subscriber using the config's `log_filter`
pub fn init_from_config(config: &DocIdConfig) -> bool {
    let filter = config.log_filter.as_deref().unwrap_or(default_filter());
    init_with(LogFormat::Compact, filter)
}

/// Check if debug logging is enabled
#[inline]
pub fn is_debug_enabled() -> bool {
    tracing::enabled!(Level::DEBUG)
}

/// Check if trace logging is enabled
#[inline]
pub fn is_trace_enabled() -> bool {
    tracing::enabled!(Level::TRACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_refused() {
        init_with(LogFormat::Compact, "docid=debug");
        assert!(!init_with(LogFormat::Pretty, "docid=trace"));
        assert!(!init_from_config(&DocIdConfig::default()));
        init();
        tracing::debug!(path = "/tmp/x", "Structured log");
    }

    #[test]
    fn test_invalid_fallback_uses_default_filter() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter("docid=notalevel");
        assert_eq!(filter.to_string(), EnvFilter::new(default_filter()).to_string());
    }

    #[test]
    fn test_default_filter_targets_this_crate() {
        assert!(default_filter().starts_with("docid="));
        let _ = is_debug_enabled();
        let _ = is_trace_enabled();
    }
}
