//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`.  The filter comes from
//! `ENCRYPTO_LOG` when set, otherwise from the `-v` count on the
//! command line.  Log events never carry passwords, hashes or key bytes.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "ENCRYPTO_LOG";

/// Map a `-v` count to a default filter level.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.  Safe to call more than once; later
/// calls are ignored.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("encrypto={}", level_for_verbosity(verbose))));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
