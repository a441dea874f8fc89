//! Channel Rate Limiting Module
//!
//! This module enforces per-channel, per-denom transfer quotas expressed as a
//! percentage of the denom's total value. Every transfer packet is checked
//! against the quota of its `(denom, channel_id)` pair, admitted packets are
//! added to the window's flow, and the window is reset on hour epochs.
//!
//! # Features
//!
//! - Percentage caps per direction, compared by cross-multiplication on
//!   arbitrary-precision amounts
//! - Pending send packet ledger so timeouts and failed acks give the outflow back
//!   exactly once
//! - Epoch-driven resets with per rate limit failure isolation
//! - Authority-gated administration (add, update, remove, reset)
//! - Genesis import and export
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Rate Limit Manager                        │
//! │   send / recv / ack / timeout  ·  admin  ·  epoch tick       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌───────────────────────────────┐    │
//! │  │ Rate Limit Store │  │ Pending Send Packet Ledger    │    │
//! │  └──────────────────┘  └───────────────────────────────┘    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Host: channel valuation · channel registry · hour epoch     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod config;
pub mod epoch;
pub mod error;
pub mod genesis;
pub mod host;
pub mod manager;
pub mod pending;
pub mod quota;
pub mod store;

pub use admin::{AddRateLimit, RemoveRateLimit, ResetRateLimit, UpdateRateLimit};
pub use config::RateLimitConfig;
pub use epoch::{EpochReport, HourEpoch};
pub use error::{RateLimitError, RateLimitResult};
pub use genesis::GenesisState;
pub use host::{ChannelRegistry, ChannelValuationProvider, EpochProvider, Host, InMemoryHost};
pub use manager::{PacketDecision, RateLimitManager, TransferPacket};
pub use pending::{PendingPacket, PendingPacketLedger};
pub use quota::{Amount, Direction, Flow, Path, Quota, RateLimit};
pub use store::RateLimitStore;

#[cfg(test)]
mod proptests;
