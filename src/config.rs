// Configuration File Support
//
// This module provides configuration file parsing for the rate limiter daemon and CLI.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from XDG config directory: ~/.config/channel-ratelimit/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rate_limit::{GenesisState, RateLimitConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics and query server configuration
    pub metrics: MetricsConfig,

    /// Authority, epoch length and host description
    pub rate_limit: RateLimitConfig,

    /// Initial rate limiter state
    pub genesis: GenesisState,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to start the HTTP server in `serve`
    pub enabled: bool,

    /// Port for the HTTP server
    pub port: u16,

    /// How often the daemon checks for a new hour epoch, in seconds
    pub tick_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            tick_interval_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        // Environment variables take precedence over the file
        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/channel-ratelimit/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "channel-ratelimit") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback if XDG dirs cannot be determined
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("channel-ratelimit")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// - RATELIMIT_LOG_LEVEL
    /// - RATELIMIT_LOG_FORMAT
    /// - RATELIMIT_AUTHORITY
    /// - RATELIMIT_EPOCH_SECS
    /// - RATELIMIT_METRICS_ENABLED
    /// - RATELIMIT_METRICS_PORT
    fn apply_env_overrides(mut self) -> Self {
        // Logging overrides
        if let Ok(level) = std::env::var("RATELIMIT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RATELIMIT_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Rate limit overrides
        if let Ok(authority) = std::env::var("RATELIMIT_AUTHORITY") {
            if !authority.is_empty() {
                self.rate_limit.authority = authority;
            }
        }
        if let Ok(secs) = std::env::var("RATELIMIT_EPOCH_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                if secs > 0 {
                    self.rate_limit.epoch_duration_secs = secs;
                }
            }
        }

        // Metrics overrides
        if let Ok(enabled) = std::env::var("RATELIMIT_METRICS_ENABLED") {
            self.metrics.enabled = enabled.parse().unwrap_or(self.metrics.enabled);
        }
        if let Ok(port) = std::env::var("RATELIMIT_METRICS_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.metrics.port = port;
            }
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.metrics.port == 0 {
            anyhow::bail!("Metrics port must be > 0");
        }
        if self.metrics.tick_interval_secs == 0 {
            anyhow::bail!("Epoch tick interval must be > 0");
        }

        self.rate_limit
            .validate()
            .context("Invalid rate_limit section")?;
        self.genesis.validate().context("Invalid genesis section")?;

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}
