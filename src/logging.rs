//! Logging bootstrap

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wsopt_core::error::{Result, WsoptError};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "wsopt=info,wsopt_core=info,wsopt_metrics=info";

/// Install the global subscriber
///
/// `quiet` overrides `RUST_LOG` and only lets warnings through. A second call
/// returns an error instead of replacing the installed subscriber.
pub fn init(quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| WsoptError::Config(format!("logging already initialized: {e}")))
}
