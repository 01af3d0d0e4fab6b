//! Logging setup and the host-visible failure channel.

use std::fmt::Display;

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber filtered by `filter`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Logs `msg` as a script-visible error and returns `ret`.
pub(crate) fn fail<T>(ret: T, msg: impl Display) -> T {
    tracing::error!("{msg}");
    ret
}
