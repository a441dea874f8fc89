//! Pending Send Packet Ledger
//!
//! Tracks send packets that were admitted and counted against an outflow but
//! whose acknowledgement or timeout has not arrived yet. A reversal is only
//! applied while the packet is still in the ledger, which makes duplicate
//! ack/timeout delivery harmless.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::admin::validate_channel_id;
use super::error::RateLimitError;

/// Identifier of an in-flight send packet
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingPacket {
    pub channel_id: String,
    pub sequence: u64,
}

impl PendingPacket {
    pub fn new(channel_id: impl Into<String>, sequence: u64) -> Self {
        Self {
            channel_id: channel_id.into(),
            sequence,
        }
    }
}

/// Formats as `{channel_id}/{sequence}`, the form used in genesis files
impl fmt::Display for PendingPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.sequence)
    }
}

impl FromStr for PendingPacket {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            RateLimitError::InvalidGenesis(format!(
                "pending packet id '{}' must be of the form 'channel-{{N}}/{{sequence}}'",
                s
            ))
        };
        let (channel_id, sequence) = s.rsplit_once('/').ok_or_else(invalid)?;
        validate_channel_id(channel_id).map_err(|_| invalid())?;
        let sequence = sequence.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::new(channel_id, sequence))
    }
}

/// In-flight send packets grouped by channel
#[derive(Debug, Clone, Default)]
pub struct PendingPacketLedger {
    packets: BTreeMap<String, BTreeSet<u64>>,
}

impl PendingPacketLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a send packet; returns false if the sequence was already pending
    pub fn add(&mut self, channel_id: &str, sequence: u64) -> bool {
        self.packets
            .entry(channel_id.to_string())
            .or_default()
            .insert(sequence)
    }

    /// Remove a single packet; returns whether it was pending
    pub fn remove(&mut self, channel_id: &str, sequence: u64) -> bool {
        let Some(sequences) = self.packets.get_mut(channel_id) else {
            return false;
        };
        let removed = sequences.remove(&sequence);
        if sequences.is_empty() {
            self.packets.remove(channel_id);
        }
        removed
    }

    /// Drop every pending packet on the channel, returning how many were removed
    pub fn remove_all(&mut self, channel_id: &str) -> usize {
        self.packets
            .remove(channel_id)
            .map(|sequences| sequences.len())
            .unwrap_or(0)
    }

    pub fn exists(&self, channel_id: &str, sequence: u64) -> bool {
        self.packets
            .get(channel_id)
            .is_some_and(|sequences| sequences.contains(&sequence))
    }

    /// All pending packets ordered by channel then sequence
    pub fn all(&self) -> Vec<PendingPacket> {
        self.packets
            .iter()
            .flat_map(|(channel_id, sequences)| {
                sequences
                    .iter()
                    .map(move |sequence| PendingPacket::new(channel_id.clone(), *sequence))
            })
            .collect()
    }

    /// Pending sequences on one channel, ascending
    pub fn channel(&self, channel_id: &str) -> Vec<u64> {
        self.packets
            .get(channel_id)
            .map(|sequences| sequences.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.packets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
