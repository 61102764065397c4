//! 📡 Telemetry: the fmt subscriber, for when `println!` debugging is no longer an option
//! (it is never an option, the host owns stdout).
//!
//! Logs go to stderr. Module init may run more than once per process (tests, hosts that
//! re-instantiate), so installing the subscriber is a `try_init` and a second install is
//! reported instead of panicking.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// 🔔 Install a global fmt subscriber filtered by `directives` (`EnvFilter` syntax).
///
/// Errors if the directives don't parse or a global subscriber is already set.
pub fn init_tracing(directives: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(directives).with_context(|| {
        format!("💀 '{directives}' is not a log filter. Try something like 'tangent_guest=debug'.")
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("💀 A tracing subscriber was already installed: {e}"))
}
