//! Tracing subscriber setup.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Build the env filter, falling back to `verbose` or the default level.
fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber writing to stderr.
///
/// Stdout stays reserved for command output. Calling this twice is harmless;
/// the second call is ignored.
pub fn init(verbose: bool) {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(verbose))
        .try_init();
}
