#![forbid(unsafe_code)]

//! JSON log bootstrap for production hosts.
//!
//! The filter is read from `LANTERN_LOG` (same syntax as `RUST_LOG`) and
//! defaults to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::prelude::*;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "LANTERN_LOG";

/// Install a global JSON subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_json() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;
    tracing::debug!(env = LOG_ENV, "json logging installed");
    Ok(())
}
