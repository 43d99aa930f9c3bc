//! Tracing subscriber setup for the `orca` binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Logs go to stderr; stdout carries summaries.
///
/// `verbose` raises the default filter to `debug` for this crate. `RUST_LOG`
/// always wins when set.
pub fn init(verbose: bool, json: bool) {
    let default = if verbose {
        "info,orca=debug"
    } else {
        DEFAULT_FILTER
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let installed = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
    };
    // Fails only when a global subscriber already exists; that one stays.
    if let Err(e) = installed {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_first_subscriber() {
        init(false, false);
        init(true, true);
        tracing::info!("still logging");
    }
}
