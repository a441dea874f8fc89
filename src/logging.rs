//! Logging Setup
//!
//! Installs the global `tracing` subscriber. Log lines go to stderr so that
//! JSON printed by CLI commands on stdout stays machine readable.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Initialize tracing from configuration; `verbose` forces DEBUG
pub fn init(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };

    let builder = fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr);

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
