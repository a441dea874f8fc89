//! Rate Limit Configuration
//!
//! Authority, epoch length and the static host description (open channels and
//! denom valuations) used when the rate limiter runs outside a chain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::admin::validate_channel_id;
use super::epoch::DEFAULT_EPOCH_DURATION_SECS;
use super::error::{RateLimitError, RateLimitResult};
use super::host::InMemoryHost;
use super::quota::Amount;

/// Default administration principal
pub const DEFAULT_AUTHORITY: &str = "gov";

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Principal allowed to add, update, remove and reset rate limits
    pub authority: String,

    /// Hour epoch length in seconds
    pub epoch_duration_secs: u64,

    /// Open channels: channel id -> counterparty chain id
    pub channels: BTreeMap<String, String>,

    /// Denom valuations as decimal strings
    pub channel_values: BTreeMap<String, String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            epoch_duration_secs: DEFAULT_EPOCH_DURATION_SECS,
            channels: BTreeMap::new(),
            channel_values: BTreeMap::new(),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get epoch duration
    pub fn epoch_duration(&self) -> Duration {
        Duration::from_secs(self.epoch_duration_secs)
    }

    fn parse_value(denom: &str, value: &str) -> RateLimitResult<Amount> {
        Amount::parse_bytes(value.trim().as_bytes(), 10).ok_or_else(|| {
            RateLimitError::InvalidRequest(format!(
                "channel value for {} is not a decimal amount: '{}'",
                denom, value
            ))
        })
    }

    pub fn validate(&self) -> RateLimitResult<()> {
        if self.authority.is_empty() {
            return Err(RateLimitError::InvalidRequest(
                "authority can not be empty".to_string(),
            ));
        }
        if self.epoch_duration_secs == 0 {
            return Err(RateLimitError::InvalidRequest(
                "epoch duration can not be zero".to_string(),
            ));
        }
        for channel_id in self.channels.keys() {
            validate_channel_id(channel_id)?;
        }
        for (denom, value) in &self.channel_values {
            Self::parse_value(denom, value)?;
        }
        Ok(())
    }

    /// Build the in-memory host described by this configuration
    pub fn build_host(&self) -> RateLimitResult<InMemoryHost> {
        let mut host = InMemoryHost::new();
        for (channel_id, chain_id) in &self.channels {
            host.add_channel(channel_id, chain_id);
        }
        for (denom, value) in &self.channel_values {
            host.set_channel_value(denom, Self::parse_value(denom, value)?);
        }
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::host::{ChannelRegistry, ChannelValuationProvider};

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.authority, DEFAULT_AUTHORITY);
        assert_eq!(config.epoch_duration(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_host() {
        let mut config = RateLimitConfig::default();
        config
            .channels
            .insert("channel-0".to_string(), "cosmoshub-4".to_string());
        config
            .channel_values
            .insert("uatom".to_string(), "340282366920938463463374607431768211456".to_string());

        let host = config.build_host().unwrap();
        assert!(host.channel_exists("channel-0"));
        assert_eq!(
            host.channel_value("uatom").unwrap(),
            Amount::from(u128::MAX) + 1u32
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut config = RateLimitConfig::default();
        config
            .channel_values
            .insert("uatom".to_string(), "12abc".to_string());
        assert!(config.validate().is_err());
        assert!(config.build_host().is_err());

        let mut config = RateLimitConfig::default();
        config
            .channels
            .insert("transfer-0".to_string(), "cosmoshub-4".to_string());
        assert!(config.validate().is_err());

        let config = RateLimitConfig {
            epoch_duration_secs: 0,
            ..RateLimitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = RateLimitConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RateLimitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
