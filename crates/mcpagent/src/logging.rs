//! Process-wide log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` when `verbose`
/// is set and `warn` when it is not. Only the first call installs anything:
/// later calls (or a subscriber installed elsewhere) make this return `false`.
pub fn init(verbose: bool) -> bool {
    let log_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
