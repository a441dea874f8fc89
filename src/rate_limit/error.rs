//! Rate Limit Error Types
//!
//! This module defines all error types that can occur while checking packets
//! against a quota or administering rate limits.

use super::quota::{Amount, Direction};

/// Result type alias for rate limit operations
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Error types for rate limit operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// No rate limit exists for the pair
    #[error("Rate limit not found for denom {denom} on {channel_id}")]
    NotFound { denom: String, channel_id: String },

    /// A rate limit already exists for the pair
    #[error("Rate limit already exists for denom {denom} on {channel_id}")]
    AlreadyExists { denom: String, channel_id: String },

    /// The denom has no value locked against the channel
    #[error("Channel value is zero for denom {0}")]
    ZeroChannelValue(String),

    /// The host does not know the channel
    #[error("Channel {0} not found")]
    ChannelNotFound(String),

    /// The packet would push the flow past the configured threshold
    #[error(
        "{direction} quota exceeded for denom {denom} on {channel_id}: \
         amount {amount}, threshold {threshold}"
    )]
    QuotaExceeded {
        direction: Direction,
        denom: String,
        channel_id: String,
        amount: Amount,
        threshold: Amount,
    },

    /// Administration request was not signed by the authority
    #[error("Invalid authority; expected {expected}, got {got}")]
    Unauthorized { expected: String, got: String },

    /// Malformed administration request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A host collaborator (valuation, channel registry) failed
    #[error("Host error: {0}")]
    Host(String),

    /// Genesis state failed validation
    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),
}

impl RateLimitError {
    pub(crate) fn not_found(denom: &str, channel_id: &str) -> Self {
        RateLimitError::NotFound {
            denom: denom.to_string(),
            channel_id: channel_id.to_string(),
        }
    }

    pub(crate) fn already_exists(denom: &str, channel_id: &str) -> Self {
        RateLimitError::AlreadyExists {
            denom: denom.to_string(),
            channel_id: channel_id.to_string(),
        }
    }

    /// Whether this error is the ordinary "packet refused" outcome rather than a fault
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, RateLimitError::QuotaExceeded { .. })
    }
}
