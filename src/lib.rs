//! Channel Rate Limiter Library
//!
//! Per-channel, per-denom transfer quotas for inter-chain packet relay: the
//! flow engine and its administration live in [`rate_limit`], the standalone
//! [`node`] drives it from the CLI and the daemon.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod metrics_server;
pub mod node;
pub mod rate_limit;
