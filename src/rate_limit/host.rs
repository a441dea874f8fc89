//! Host Chain Collaborators
//!
//! The rate limiter never owns channel state or balances. It asks the host
//! through these traits, which are passed explicitly into every call that
//! needs them.

use std::collections::{BTreeMap, BTreeSet};

use super::error::{RateLimitError, RateLimitResult};
use super::quota::Amount;

/// Supplies the total value of a denom used as the denominator of percentage caps
pub trait ChannelValuationProvider {
    fn channel_value(&self, denom: &str) -> RateLimitResult<Amount>;
}

/// Channel metadata known to the host
pub trait ChannelRegistry {
    fn channel_exists(&self, channel_id: &str) -> bool;

    /// Chain id of the counterparty behind the channel's client
    fn counterparty_chain_id(&self, channel_id: &str) -> Option<String>;
}

/// Source of the current hour epoch number
pub trait EpochProvider {
    fn current_epoch_number(&self) -> u64;
}

/// Everything administration and resets need from the host
pub trait Host: ChannelValuationProvider + ChannelRegistry {}

impl<T: ChannelValuationProvider + ChannelRegistry> Host for T {}

/// Deterministic in-memory host used by the CLI, the daemon and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryHost {
    /// channel id -> counterparty chain id
    channels: BTreeMap<String, String>,

    /// denom -> total value
    channel_values: BTreeMap<String, Amount>,

    /// denoms whose valuation lookup fails
    unavailable: BTreeSet<String>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open channel and the chain on its other end
    pub fn add_channel(&mut self, channel_id: &str, counterparty_chain_id: &str) {
        self.channels
            .insert(channel_id.to_string(), counterparty_chain_id.to_string());
    }

    pub fn set_channel_value(&mut self, denom: &str, value: impl Into<Amount>) {
        self.channel_values.insert(denom.to_string(), value.into());
    }

    /// Make valuation of `denom` fail until the value is set again
    pub fn set_unavailable(&mut self, denom: &str) {
        self.unavailable.insert(denom.to_string());
    }

    pub fn set_available(&mut self, denom: &str) {
        self.unavailable.remove(denom);
    }

    pub fn channels(&self) -> impl Iterator<Item = (&String, &String)> {
        self.channels.iter()
    }
}

impl ChannelValuationProvider for InMemoryHost {
    fn channel_value(&self, denom: &str) -> RateLimitResult<Amount> {
        if self.unavailable.contains(denom) {
            return Err(RateLimitError::Host(format!(
                "valuation unavailable for denom {}",
                denom
            )));
        }
        Ok(self.channel_values.get(denom).cloned().unwrap_or_default())
    }
}

impl ChannelRegistry for InMemoryHost {
    fn channel_exists(&self, channel_id: &str) -> bool {
        self.channels.contains_key(channel_id)
    }

    fn counterparty_chain_id(&self, channel_id: &str) -> Option<String> {
        self.channels.get(channel_id).cloned()
    }
}
