//! Structured logging via `tracing`.
//!
//! Output goes to stderr so it never mixes with reports on stdout. `RUST_LOG`
//! always wins; otherwise the level follows the `-v` count.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter directive for a given `-v` count.
///
/// `quiet` is used by the TUI, where log lines would corrupt the alternate screen.
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "off";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Safe to call more than once (later calls are no-ops).
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .try_init();
}
