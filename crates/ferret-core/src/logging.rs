//! Tracing subscriber setup.
//!
//! Filter priority, highest first: `FERRET_LOG`, `RUST_LOG`, then `info`.
//! Output goes to stderr so stdout stays free for reports.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FERRET_LOG";

/// Install the global subscriber.
///
/// Returns false if one was already installed; calling twice is harmless.
pub fn init_tracing() -> bool {
    let stderr_is_tty = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(stderr_is_tty)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(build_env_filter(std::env::var(LOG_ENV).ok()))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

/// Unparseable directives fall through to the next source rather than failing.
fn build_env_filter(project_directives: Option<String>) -> EnvFilter {
    if let Some(filter) = project_directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new("info")
}
