//! Standalone Rate Limiter Node
//!
//! Bundles the manager with the in-memory host and the hour epoch clock so the
//! CLI and the daemon can drive the rate limiter without a chain. Events are
//! applied strictly one at a time, in the order given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::rate_limit::{
    AddRateLimit, EpochReport, GenesisState, HourEpoch, InMemoryHost, PacketDecision,
    RateLimitManager, RateLimitResult, RemoveRateLimit, ResetRateLimit, TransferPacket,
    UpdateRateLimit,
};

/// Node shared between the epoch loop and HTTP handlers
pub type SharedNode = Arc<RwLock<Node>>;

/// One step of a replay script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Outgoing transfer
    Send(TransferPacket),

    /// Incoming transfer
    Recv(TransferPacket),

    /// Successful acknowledgement of a send packet
    Ack { channel_id: String, sequence: u64 },

    /// Error acknowledgement of a send packet
    AckError(TransferPacket),

    /// Send packet timed out
    Timeout(TransferPacket),

    /// Explicit epoch tick
    Epoch { epoch_number: u64 },

    /// New block; ticks the epoch when an hour boundary is crossed
    Block { time: DateTime<Utc> },

    Add(AddRateLimit),
    Update(UpdateRateLimit),
    Remove(RemoveRateLimit),
    Reset(ResetRateLimit),
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventOutcome {
    Admitted { decision: PacketDecision },
    Rejected { error: String },
    Reverted { applied: bool },
    Acknowledged { removed: bool },
    EpochProcessed { report: EpochReport },
    NoEpoch,
    Applied,
    Failed { error: String },
}

impl EventOutcome {
    fn from_admin(result: RateLimitResult<()>) -> Self {
        match result {
            Ok(()) => EventOutcome::Applied,
            Err(err) => EventOutcome::Failed {
                error: err.to_string(),
            },
        }
    }

    fn from_packet(result: RateLimitResult<PacketDecision>) -> Self {
        match result {
            Ok(decision) => EventOutcome::Admitted { decision },
            Err(err) if err.is_quota_exceeded() => EventOutcome::Rejected {
                error: err.to_string(),
            },
            Err(err) => EventOutcome::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Rate limiter plus the host it runs against
#[derive(Debug, Clone)]
pub struct Node {
    pub manager: RateLimitManager,
    pub host: InMemoryHost,
    pub epoch: HourEpoch,
}

impl Node {
    /// Build a node from configuration and its embedded genesis
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let host = config.rate_limit.build_host()?;
        let mut genesis = config.genesis.clone();
        genesis.hour_epoch.duration_secs = config.rate_limit.epoch_duration_secs;

        let (manager, epoch) =
            RateLimitManager::init_genesis(config.rate_limit.authority.clone(), &genesis)?;
        Ok(Self {
            manager,
            host,
            epoch,
        })
    }

    pub fn into_shared(self) -> SharedNode {
        Arc::new(RwLock::new(self))
    }

    /// Apply a single event
    pub fn apply(&mut self, event: &Event) -> EventOutcome {
        debug!(?event, "Applying event");
        match event {
            Event::Send(packet) => {
                EventOutcome::from_packet(self.manager.check_and_track_send(packet))
            }
            Event::Recv(packet) => {
                EventOutcome::from_packet(self.manager.check_and_track_recv(packet))
            }
            Event::Ack {
                channel_id,
                sequence,
            } => EventOutcome::Acknowledged {
                removed: self.manager.acknowledge_send(channel_id, *sequence),
            },
            Event::AckError(packet) | Event::Timeout(packet) => EventOutcome::Reverted {
                applied: self.manager.revert_send(packet),
            },
            Event::Epoch { epoch_number } => {
                self.epoch.epoch_number = *epoch_number;
                EventOutcome::EpochProcessed {
                    report: self.manager.on_epoch_tick(&self.host, *epoch_number),
                }
            }
            Event::Block { time } => self.begin_block(*time),
            Event::Add(msg) => EventOutcome::from_admin(self.manager.add_rate_limit(&self.host, msg)),
            Event::Update(msg) => {
                EventOutcome::from_admin(self.manager.update_rate_limit(&self.host, msg))
            }
            Event::Remove(msg) => EventOutcome::from_admin(self.manager.remove_rate_limit(msg)),
            Event::Reset(msg) => {
                EventOutcome::from_admin(self.manager.reset_rate_limit(&self.host, msg))
            }
        }
    }

    /// Apply events in order
    pub fn replay(&mut self, events: &[Event]) -> Vec<EventOutcome> {
        events.iter().map(|event| self.apply(event)).collect()
    }

    /// Start-of-block hook at `time`
    pub fn begin_block(&mut self, time: DateTime<Utc>) -> EventOutcome {
        match self.manager.begin_block(&self.host, &mut self.epoch, time) {
            Some(report) => EventOutcome::EpochProcessed { report },
            None => EventOutcome::NoEpoch,
        }
    }

    pub fn export_genesis(&self) -> GenesisState {
        self.manager.export_genesis(&self.epoch)
    }
}
