//! Diagnostic logging setup.
//!
//! The dispatcher logs through `tracing`; stale rejections go to `debug`,
//! overflow evictions to `warn`, lifecycle changes to `info`. Hosts that do
//! not install their own subscriber can call [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Builds the log filter from `NOTIFYWEAVE_LOG`, then `RUST_LOG`, then `info`.
pub fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env("NOTIFYWEAVE_LOG")
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a fmt subscriber as the global default.
///
/// Returns `false` if a global subscriber was already set, so calling it more
/// than once is harmless.
pub fn init_tracing() -> bool {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .try_init()
    .is_ok()
}
