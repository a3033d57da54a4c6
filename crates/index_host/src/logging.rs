//! Logging system setup.
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured level when it is set.

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Initialize the logging system with human-readable or JSON output
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let level = settings.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if settings.json_format {
        registry
            .with(fmt::layer().json().with_target(false))
            .try_init()
            .map_err(|e| anyhow!("failed to install JSON log subscriber: {e}"))?;
    } else {
        registry
            .with(fmt::layer().with_target(false))
            .try_init()
            .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;
    }

    info!("Logging initialized with level: {}", level);
    Ok(())
}
