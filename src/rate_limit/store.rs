//! Rate Limit Store
//!
//! Keyed storage for rate limit records. Iteration follows key order so
//! exports and query output are deterministic.

use std::collections::BTreeMap;

use super::host::ChannelRegistry;
use super::quota::{Path, RateLimit};

/// Rate limits keyed by `(denom, channel_id)`
#[derive(Debug, Clone, Default)]
pub struct RateLimitStore {
    rate_limits: BTreeMap<Path, RateLimit>,
}

impl RateLimitStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the rate limit under its path
    pub fn set(&mut self, rate_limit: RateLimit) {
        self.rate_limits.insert(rate_limit.path.clone(), rate_limit);
    }

    /// Get a copy of the rate limit for the pair
    pub fn get(&self, denom: &str, channel_id: &str) -> Option<RateLimit> {
        self.rate_limits.get(&Path::new(denom, channel_id)).cloned()
    }

    /// Whether a rate limit exists for the pair
    pub fn contains(&self, denom: &str, channel_id: &str) -> bool {
        self.rate_limits.contains_key(&Path::new(denom, channel_id))
    }

    /// Remove the rate limit for the pair
    pub fn remove(&mut self, denom: &str, channel_id: &str) -> Option<RateLimit> {
        self.rate_limits.remove(&Path::new(denom, channel_id))
    }

    /// All rate limits in key order
    pub fn all(&self) -> Vec<RateLimit> {
        self.rate_limits.values().cloned().collect()
    }

    /// Rate limits whose channel's counterparty is `chain_id`
    pub fn by_chain_id(&self, chain_id: &str, registry: &dyn ChannelRegistry) -> Vec<RateLimit> {
        self.rate_limits
            .values()
            .filter(|rl| {
                registry.counterparty_chain_id(&rl.path.channel_id).as_deref() == Some(chain_id)
            })
            .cloned()
            .collect()
    }

    /// Number of rate limits
    pub fn len(&self) -> usize {
        self.rate_limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rate_limits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::host::InMemoryHost;
    use crate::rate_limit::quota::{Amount, Quota};

    fn rate_limit(denom: &str, channel_id: &str) -> RateLimit {
        RateLimit::new(
            Path::new(denom, channel_id),
            Quota::new(10, 10, 24),
            Amount::from(1000u64),
        )
    }

    #[test]
    fn test_store_creation() {
        let store = RateLimitStore::new();
        assert!(store.is_empty());
        assert!(store.get("uatom", "channel-0").is_none());
    }

    #[test]
    fn test_set_and_get() {
        let mut store = RateLimitStore::new();
        store.set(rate_limit("uatom", "channel-0"));

        let found = store.get("uatom", "channel-0").unwrap();
        assert_eq!(found.path, Path::new("uatom", "channel-0"));
        assert!(store.get("uatom", "channel-1").is_none());
        assert!(store.get("uosmo", "channel-0").is_none());
    }

    #[test]
    fn test_set_replaces() {
        let mut store = RateLimitStore::new();
        store.set(rate_limit("uatom", "channel-0"));

        let mut updated = rate_limit("uatom", "channel-0");
        updated.quota.max_percent_send = 50;
        store.set(updated);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("uatom", "channel-0").unwrap().quota.max_percent_send, 50);
    }

    #[test]
    fn test_remove() {
        let mut store = RateLimitStore::new();
        store.set(rate_limit("uatom", "channel-0"));

        assert!(store.remove("uatom", "channel-0").is_some());
        assert!(store.remove("uatom", "channel-0").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_all_in_key_order() {
        let mut store = RateLimitStore::new();
        store.set(rate_limit("uosmo", "channel-0"));
        store.set(rate_limit("uatom", "channel-2"));
        store.set(rate_limit("uatom", "channel-1"));

        let paths: Vec<String> = store.all().iter().map(|rl| rl.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["channel-1/uatom", "channel-2/uatom", "channel-0/uosmo"]
        );
    }

    #[test]
    fn test_by_chain_id() {
        let mut host = InMemoryHost::new();
        host.add_channel("channel-0", "cosmoshub-4");
        host.add_channel("channel-1", "osmosis-1");
        host.add_channel("channel-2", "cosmoshub-4");

        let mut store = RateLimitStore::new();
        store.set(rate_limit("uatom", "channel-0"));
        store.set(rate_limit("uatom", "channel-1"));
        store.set(rate_limit("ustrd", "channel-2"));
        store.set(rate_limit("ustrd", "channel-7"));

        let hub = store.by_chain_id("cosmoshub-4", &host);
        assert_eq!(hub.len(), 2);
        assert!(hub.iter().all(|rl| rl.path.channel_id != "channel-1"));

        assert!(store.by_chain_id("juno-1", &host).is_empty());
    }
}
