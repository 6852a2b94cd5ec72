//! Log output for the command line tool.

use std::io::stderr;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Send log messages to stderr so that stdout can carry command output.
///
/// The `RUST_LOG` environment variable takes precedence over `default_level`,
/// e.g. `RUST_LOG=budget_rules=debug` shows the result of every criterion.
pub fn setup_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let terminal_log = fmt::layer().with_target(false).with_writer(stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(terminal_log)
        .init();
}
