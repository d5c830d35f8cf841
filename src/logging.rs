//! Logging setup.
//!
//! The engine logs through `tracing`. These helpers install a subscriber
//! writing to stderr, filtered by `RUST_LOG` when it is set.
//!
//! ```ignore
//! ambar_reconcile::logging::init_logging(false);
//! tracing::info!("reconciling");
//! ```

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Installs the default subscriber: `debug` when verbose, `info` otherwise.
///
/// `RUST_LOG` takes precedence over both. Returns false if a global
/// subscriber was already set.
pub fn init_logging(verbose: bool) -> bool {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    install(filter, LogFormat::Text)
}

/// Installs a subscriber with an explicit filter directive and format.
///
/// Returns false if the directive does not parse or a global subscriber was
/// already set.
pub fn init_logging_with_filter(directive: &str, format: LogFormat) -> bool {
    match EnvFilter::try_new(directive) {
        Ok(filter) => install(filter, format),
        Err(_) => false,
    }
}

fn install(filter: EnvFilter, format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.is_ok()
}
