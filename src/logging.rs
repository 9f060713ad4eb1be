//! Process-wide `tracing` subscriber setup.
//!
//! Logs always go to stderr: on `esa serve stdio` stdout carries the
//! protocol stream and must stay clean JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "ESA_LOG";

/// Install the global subscriber.
///
/// The filter comes from `ESA_LOG`, then `RUST_LOG`, then defaults to
/// `info`. Calling this more than once is harmless.
pub fn init() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
