//! Genesis Import and Export
//!
//! Full manager state in a serializable form: rate limits, pending send
//! packets and the hour epoch clock.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::admin::validate_channel_id;
use super::epoch::HourEpoch;
use super::error::{RateLimitError, RateLimitResult};
use super::manager::RateLimitManager;
use super::pending::PendingPacket;
use super::quota::RateLimit;

/// Serializable snapshot of the rate limiter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub rate_limits: Vec<RateLimit>,

    /// Pending send packets as `channel-{N}/{sequence}`
    pub pending_send_packets: Vec<String>,

    pub hour_epoch: HourEpoch,
}

impl GenesisState {
    /// Reject duplicate paths, invalid quotas and malformed packet ids
    pub fn validate(&self) -> RateLimitResult<()> {
        let mut seen = BTreeSet::new();
        for rate_limit in &self.rate_limits {
            let path = &rate_limit.path;
            if !seen.insert(path) {
                return Err(RateLimitError::InvalidGenesis(format!(
                    "duplicate rate limit for {}",
                    path
                )));
            }
            if path.denom.is_empty() {
                return Err(RateLimitError::InvalidGenesis(format!(
                    "empty denom on {}",
                    path.channel_id
                )));
            }
            validate_channel_id(&path.channel_id)
                .and_then(|_| rate_limit.quota.validate())
                .map_err(|err| {
                    RateLimitError::InvalidGenesis(format!("rate limit {}: {}", path, err))
                })?;
        }

        for id in &self.pending_send_packets {
            id.parse::<PendingPacket>()?;
        }

        if self.hour_epoch.duration_secs == 0 {
            return Err(RateLimitError::InvalidGenesis(
                "hour epoch duration can not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl RateLimitManager {
    /// Build a manager from a validated genesis state
    ///
    /// Returns the manager together with the epoch clock it should be driven by.
    pub fn init_genesis(
        authority: impl Into<String>,
        genesis: &GenesisState,
    ) -> RateLimitResult<(Self, HourEpoch)> {
        genesis.validate()?;

        let mut manager = Self::new(authority);
        let (store, pending) = manager.parts_mut();
        for rate_limit in &genesis.rate_limits {
            store.set(rate_limit.clone());
        }
        for id in &genesis.pending_send_packets {
            let packet: PendingPacket = id.parse()?;
            pending.add(&packet.channel_id, packet.sequence);
        }

        Ok((manager, genesis.hour_epoch.clone()))
    }

    /// Snapshot the manager state in key order
    pub fn export_genesis(&self, hour_epoch: &HourEpoch) -> GenesisState {
        GenesisState {
            rate_limits: self.all_rate_limits(),
            pending_send_packets: self
                .pending()
                .all()
                .iter()
                .map(ToString::to_string)
                .collect(),
            hour_epoch: hour_epoch.clone(),
        }
    }
}
