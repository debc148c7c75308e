//! Tracing subscriber installation for binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::AppError;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "warn,deepcheck=info";

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. With `json` set, events are
/// emitted as one JSON object per line.
///
/// # Errors
/// Returns [`AppError::Logging`] when a global subscriber is already set.
pub fn init_tracing(json: bool) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    installed.map_err(|error| AppError::Logging(error.to_string()))
}
