//! Tracing initialization
//!
//! Provides standardized tracing setup so that diagnostics always land on
//! stderr while stdout stays reserved for per-device command output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map a `-v` count to a log level for the fleet crates.
///
/// No flag keeps warnings only (timeouts, skipped devices), `-v` is info,
/// `-vv` debug and anything above is trace.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing/logging for a fleet binary
///
/// Sets up logging to stderr with:
/// - Formatted output without ANSI colors (for clean logs)
/// - Environment-based filtering via RUST_LOG
/// - A level for `crate_name` derived from the `-v` count
///
/// Set `LOG_FORMAT=json` for structured JSON output (useful for CI log aggregation).
/// Default is human-readable text output.
///
/// # Example
///
/// ```rust,ignore
/// fleet_common::init_tracing("adb_fleet", 0)?;
/// ```
pub fn init_tracing(crate_name: &str, verbosity: u8) -> anyhow::Result<()> {
    let directive = format!("{}={}", crate_name, level_for_verbosity(verbosity));
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(false),
            )
            .init();
    }

    Ok(())
}
