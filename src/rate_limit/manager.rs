//! Rate Limit Manager
//!
//! Central entry point for the packet lifecycle (send, receive, ack, timeout),
//! rate limit administration and epoch resets.
//!
//! Every operation runs all of its checks before its first write, so a
//! returned error never leaves a partial update behind.

use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::admin::{AddRateLimit, RemoveRateLimit, ResetRateLimit, UpdateRateLimit};
use super::epoch::{EpochReport, HourEpoch};
use super::error::{RateLimitError, RateLimitResult};
use super::host::{ChannelRegistry, ChannelValuationProvider, Host};
use super::pending::PendingPacketLedger;
use super::quota::{amount_serde, Amount, Direction, RateLimit};
use super::store::RateLimitStore;
use crate::metrics;

/// A fungible token transfer packet as seen by the rate limiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPacket {
    /// Denom as it is known on this chain
    pub denom: String,

    /// Channel on this chain's side of the connection
    pub channel_id: String,

    pub sequence: u64,

    #[serde(with = "amount_serde")]
    pub amount: Amount,
}

impl TransferPacket {
    pub fn new(
        denom: impl Into<String>,
        channel_id: impl Into<String>,
        sequence: u64,
        amount: impl Into<Amount>,
    ) -> Self {
        Self {
            denom: denom.into(),
            channel_id: channel_id.into(),
            sequence,
            amount: amount.into(),
        }
    }
}

/// Outcome of an admitted packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PacketDecision {
    /// No rate limit covers the pair
    Untracked,

    /// Zero-amount transfer, admitted without touching the flow
    ZeroAmount,

    /// Counted against the flow; `flow` is the counter after this packet
    Tracked {
        #[serde(with = "amount_serde")]
        flow: Amount,
    },
}

/// Rate limit manager
#[derive(Debug, Clone)]
pub struct RateLimitManager {
    /// Principal allowed to administer rate limits
    authority: String,

    store: RateLimitStore,

    pending: PendingPacketLedger,
}

impl RateLimitManager {
    /// Create an empty manager administered by `authority`
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            store: RateLimitStore::new(),
            pending: PendingPacketLedger::new(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Rate limit store (read-only)
    pub fn store(&self) -> &RateLimitStore {
        &self.store
    }

    /// Pending send packet ledger (read-only)
    pub fn pending(&self) -> &PendingPacketLedger {
        &self.pending
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut RateLimitStore, &mut PendingPacketLedger) {
        (&mut self.store, &mut self.pending)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get_rate_limit(&self, denom: &str, channel_id: &str) -> Option<RateLimit> {
        self.store.get(denom, channel_id)
    }

    pub fn all_rate_limits(&self) -> Vec<RateLimit> {
        self.store.all()
    }

    pub fn rate_limits_by_chain_id(
        &self,
        chain_id: &str,
        registry: &dyn ChannelRegistry,
    ) -> Vec<RateLimit> {
        self.store.by_chain_id(chain_id, registry)
    }

    // ------------------------------------------------------------------
    // Packet lifecycle
    // ------------------------------------------------------------------

    /// Check an outgoing transfer against its quota and count it as outflow
    ///
    /// Admitted packets are recorded as pending so a later failure or
    /// timeout can give the outflow back. A sequence that is already pending
    /// on the channel is refused without touching the flow.
    pub fn check_and_track_send(
        &mut self,
        packet: &TransferPacket,
    ) -> RateLimitResult<PacketDecision> {
        if self.pending.exists(&packet.channel_id, packet.sequence) {
            warn!(
                channel_id = %packet.channel_id,
                sequence = packet.sequence,
                "Send packet sequence is already pending"
            );
            metrics::record_packet(Direction::Send, "duplicate");
            return Err(RateLimitError::InvalidRequest(format!(
                "send packet {}/{} is already pending",
                packet.channel_id, packet.sequence
            )));
        }

        let decision = self.check_and_track(Direction::Send, packet)?;
        if let PacketDecision::Tracked { .. } = decision {
            self.pending.add(&packet.channel_id, packet.sequence);
            metrics::PENDING_SEND_PACKETS.set(self.pending.len() as i64);
        }
        Ok(decision)
    }

    /// Check an incoming transfer against its quota and count it as inflow
    pub fn check_and_track_recv(
        &mut self,
        packet: &TransferPacket,
    ) -> RateLimitResult<PacketDecision> {
        self.check_and_track(Direction::Recv, packet)
    }

    fn check_and_track(
        &mut self,
        direction: Direction,
        packet: &TransferPacket,
    ) -> RateLimitResult<PacketDecision> {
        let Some(mut rate_limit) = self.store.get(&packet.denom, &packet.channel_id) else {
            metrics::record_packet(direction, "untracked");
            return Ok(PacketDecision::Untracked);
        };

        if packet.amount.is_zero() {
            metrics::record_packet(direction, "zero_amount");
            return Ok(PacketDecision::ZeroAmount);
        }

        if let Err(err) = rate_limit.update_flow(direction, &packet.amount) {
            warn!(
                direction = %direction,
                denom = %packet.denom,
                channel_id = %packet.channel_id,
                sequence = packet.sequence,
                amount = %packet.amount,
                "Rate limit exceeded"
            );
            metrics::record_packet(direction, "rejected");
            return Err(err);
        }

        let flow = rate_limit.flow.get(direction).clone();
        self.store.set(rate_limit);

        debug!(
            direction = %direction,
            denom = %packet.denom,
            channel_id = %packet.channel_id,
            sequence = packet.sequence,
            flow = %flow,
            "Packet admitted"
        );
        metrics::record_packet(direction, "admitted");
        Ok(PacketDecision::Tracked { flow })
    }

    /// Successful acknowledgement: the outflow stands, stop tracking the packet
    pub fn acknowledge_send(&mut self, channel_id: &str, sequence: u64) -> bool {
        let removed = self.pending.remove(channel_id, sequence);
        if removed {
            debug!(channel_id, sequence, "Send packet acknowledged");
            metrics::PENDING_SEND_PACKETS.set(self.pending.len() as i64);
        }
        removed
    }

    /// Failed acknowledgement or timeout: give the outflow back
    ///
    /// Only packets still in the pending ledger are reverted. Packets sent
    /// before the last reset, or already reverted, are ignored. Returns
    /// whether a reversal was applied.
    pub fn revert_send(&mut self, packet: &TransferPacket) -> bool {
        if !self.pending.exists(&packet.channel_id, packet.sequence) {
            debug!(
                channel_id = %packet.channel_id,
                sequence = packet.sequence,
                "Send packet not pending, nothing to revert"
            );
            return false;
        }

        if let Some(mut rate_limit) = self.store.get(&packet.denom, &packet.channel_id) {
            rate_limit.revert_outflow(&packet.amount);
            self.store.set(rate_limit);
        }
        self.pending.remove(&packet.channel_id, packet.sequence);

        info!(
            denom = %packet.denom,
            channel_id = %packet.channel_id,
            sequence = packet.sequence,
            amount = %packet.amount,
            "Reverted send packet outflow"
        );
        metrics::REVERTED_SEND_PACKETS_TOTAL.inc();
        metrics::PENDING_SEND_PACKETS.set(self.pending.len() as i64);
        true
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    fn check_authority(&self, authority: &str) -> RateLimitResult<()> {
        if authority != self.authority {
            return Err(RateLimitError::Unauthorized {
                expected: self.authority.clone(),
                got: authority.to_string(),
            });
        }
        Ok(())
    }

    /// Create a rate limit. Fails if it already exists or the channel value is 0
    pub fn add_rate_limit<H: Host + ?Sized>(
        &mut self,
        host: &H,
        msg: &AddRateLimit,
    ) -> RateLimitResult<()> {
        msg.validate_basic()?;
        self.check_authority(&msg.authority)?;

        let channel_value = host.channel_value(&msg.denom)?;
        if channel_value.is_zero() {
            return Err(RateLimitError::ZeroChannelValue(msg.denom.clone()));
        }
        if self.store.contains(&msg.denom, &msg.channel_id) {
            return Err(RateLimitError::already_exists(&msg.denom, &msg.channel_id));
        }
        if !host.channel_exists(&msg.channel_id) {
            return Err(RateLimitError::ChannelNotFound(msg.channel_id.clone()));
        }

        self.store
            .set(RateLimit::new(msg.path(), msg.quota(), channel_value));

        info!(
            denom = %msg.denom,
            channel_id = %msg.channel_id,
            max_percent_send = msg.max_percent_send,
            max_percent_recv = msg.max_percent_recv,
            duration_hours = msg.duration_hours,
            "Added rate limit"
        );
        metrics::RATE_LIMITS_ACTIVE.set(self.store.len() as i64);
        Ok(())
    }

    /// Replace the quota of an existing rate limit
    ///
    /// The flow restarts from zero and the channel's pending send packets are
    /// forgotten, so a late timeout cannot draw down the new window.
    pub fn update_rate_limit<V: ChannelValuationProvider + ?Sized>(
        &mut self,
        valuation: &V,
        msg: &UpdateRateLimit,
    ) -> RateLimitResult<()> {
        msg.validate_basic()?;
        self.check_authority(&msg.authority)?;

        if !self.store.contains(&msg.denom, &msg.channel_id) {
            return Err(RateLimitError::not_found(&msg.denom, &msg.channel_id));
        }
        let channel_value = valuation.channel_value(&msg.denom)?;

        self.store
            .set(RateLimit::new(msg.path(), msg.quota(), channel_value));
        let cleared = self.pending.remove_all(&msg.channel_id);
        metrics::PENDING_SEND_PACKETS.set(self.pending.len() as i64);

        info!(
            denom = %msg.denom,
            channel_id = %msg.channel_id,
            cleared_pending = cleared,
            max_percent_send = msg.max_percent_send,
            max_percent_recv = msg.max_percent_recv,
            duration_hours = msg.duration_hours,
            "Updated rate limit"
        );
        Ok(())
    }

    /// Delete a rate limit; pending packets on the channel are left untouched
    pub fn remove_rate_limit(&mut self, msg: &RemoveRateLimit) -> RateLimitResult<()> {
        msg.validate_basic()?;
        self.check_authority(&msg.authority)?;

        if self.store.remove(&msg.denom, &msg.channel_id).is_none() {
            return Err(RateLimitError::not_found(&msg.denom, &msg.channel_id));
        }

        info!(denom = %msg.denom, channel_id = %msg.channel_id, "Removed rate limit");
        metrics::RATE_LIMITS_ACTIVE.set(self.store.len() as i64);
        Ok(())
    }

    /// Reset the flow of a rate limit on demand
    pub fn reset_rate_limit<V: ChannelValuationProvider + ?Sized>(
        &mut self,
        valuation: &V,
        msg: &ResetRateLimit,
    ) -> RateLimitResult<()> {
        msg.validate_basic()?;
        self.check_authority(&msg.authority)?;
        self.reset(valuation, &msg.denom, &msg.channel_id)
    }

    /// Zero inflow and outflow, refresh the channel value and forget the
    /// channel's pending send packets
    pub fn reset<V: ChannelValuationProvider + ?Sized>(
        &mut self,
        valuation: &V,
        denom: &str,
        channel_id: &str,
    ) -> RateLimitResult<()> {
        let mut rate_limit = self
            .store
            .get(denom, channel_id)
            .ok_or_else(|| RateLimitError::not_found(denom, channel_id))?;
        let channel_value = valuation.channel_value(denom)?;

        rate_limit.reset_flow(channel_value);
        self.store.set(rate_limit);
        let cleared = self.pending.remove_all(channel_id);

        info!(denom, channel_id, cleared_pending = cleared, "Reset rate limit");
        metrics::PENDING_SEND_PACKETS.set(self.pending.len() as i64);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Epochs
    // ------------------------------------------------------------------

    /// Reset every rate limit whose window expires at `epoch_number`
    ///
    /// A failed reset is logged and reported; it does not stop the others.
    pub fn on_epoch_tick<V: ChannelValuationProvider + ?Sized>(
        &mut self,
        valuation: &V,
        epoch_number: u64,
    ) -> EpochReport {
        let mut report = EpochReport {
            epoch_number,
            ..EpochReport::default()
        };

        let due: Vec<_> = self
            .store
            .all()
            .into_iter()
            .filter(|rl| rl.quota.resets_at(epoch_number))
            .map(|rl| rl.path)
            .collect();

        for path in due {
            match self.reset(valuation, &path.denom, &path.channel_id) {
                Ok(()) => {
                    metrics::EPOCH_RESETS_TOTAL.with_label_values(&["ok"]).inc();
                    report.reset.push(path);
                }
                Err(err) => {
                    error!(
                        denom = %path.denom,
                        channel_id = %path.channel_id,
                        epoch = epoch_number,
                        error = %err,
                        "Unable to reset quota"
                    );
                    metrics::EPOCH_RESETS_TOTAL.with_label_values(&["error"]).inc();
                    report.failed.push((path, err.to_string()));
                }
            }
        }

        metrics::CURRENT_EPOCH.set(i64::try_from(epoch_number).unwrap_or(i64::MAX));
        debug!(
            epoch = epoch_number,
            reset = report.reset.len(),
            failed = report.failed.len(),
            "Epoch tick processed"
        );
        report
    }

    /// Start-of-block hook: run the epoch tick when a new hour epoch begins
    pub fn begin_block<V: ChannelValuationProvider + ?Sized>(
        &mut self,
        valuation: &V,
        epoch: &mut HourEpoch,
        block_time: DateTime<Utc>,
    ) -> Option<EpochReport> {
        let epoch_number = epoch.check_epoch_starting(block_time)?;
        Some(self.on_epoch_tick(valuation, epoch_number))
    }
}
