//! Logging setup controlled by environment variables.
//!
//! - `AGORA_DEBUG=true|1|yes` - enable debug logging
//! - `AGORA_LOG_LEVEL=trace|debug|info|warn|error` - set the level explicitly
//! - `AGORA_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! The client logs through `tracing`; SQL statements are `debug` events and
//! slow queries are `warn` events. [`init`] installs a subscriber only when
//! the `tracing-subscriber` feature is enabled, otherwise events go to
//! whatever subscriber the application set up.
//!
//! ```rust,no_run
//! agora_query::logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Whether `AGORA_DEBUG` is set to a truthy value.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("AGORA_DEBUG")
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn resolve_level(explicit: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match explicit.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

fn resolve_format(explicit: Option<&str>) -> &'static str {
    match explicit.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// The level from `AGORA_LOG_LEVEL`, defaulting to `debug` when
/// `AGORA_DEBUG` is on and `warn` otherwise.
pub fn log_level() -> &'static str {
    resolve_level(env::var("AGORA_LOG_LEVEL").ok().as_deref(), is_debug_enabled())
}

/// The format from `AGORA_LOG_FORMAT`.
pub fn log_format() -> &'static str {
    resolve_format(env::var("AGORA_LOG_FORMAT").ok().as_deref())
}

/// Filter directive covering the client's crates.
pub fn filter_directive(level: &str) -> String {
    format!("agora={level},agora_query={level},agora_postgres={level}")
}

/// Install the global subscriber once. Does nothing unless `AGORA_DEBUG`
/// or `AGORA_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("AGORA_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{fmt, prelude::*, EnvFilter};

            let level = log_level();
            let filter = EnvFilter::try_new(filter_directive(level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            let installed = match log_format() {
                "json" => registry.with(fmt::layer().json()).try_init(),
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                _ => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = log_format(), "agora logging initialized");
            }
        }
    });
}

/// `debug!` that only fires when `AGORA_DEBUG` is on.
#[macro_export]
macro_rules! agora_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}
