//! Logging bootstrap

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber, logging to stderr.
///
/// Without `-v` flags `RUST_LOG` is honored, defaulting to `warn`.
pub fn init_logging(verbosity: u8) {
    let filter = if verbosity == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(0)))
    } else {
        EnvFilter::new(filter_directive(verbosity))
    };

    // A subscriber installed by an embedding program takes precedence
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
