//! Quota, Flow and Rate Limit Types
//!
//! This module provides the core rate limit record and the percentage-of-channel
//! check applied to every transfer.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{RateLimitError, RateLimitResult};

/// Arbitrary-precision token amount
pub type Amount = BigUint;

/// Highest percentage a quota may allow in either direction
pub const MAX_PERCENT: u32 = 100;

/// Direction of a transfer relative to this chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Tokens leaving this chain
    Send,
    /// Tokens arriving on this chain
    Recv,
}

impl Direction {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Recv => "recv",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a rate limit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path {
    /// Denom the quota applies to
    pub denom: String,

    /// Channel the quota applies to
    pub channel_id: String,
}

impl Path {
    pub fn new(denom: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.denom)
    }
}

/// Policy half of a rate limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Max percent of the channel value that may leave per window (0 = no cap)
    pub max_percent_send: u32,

    /// Max percent of the channel value that may arrive per window (0 = no cap)
    pub max_percent_recv: u32,

    /// Window length in hours; the flow is reset when the hour epoch is a multiple of it
    pub duration_hours: u64,
}

impl Quota {
    pub fn new(max_percent_send: u32, max_percent_recv: u32, duration_hours: u64) -> Self {
        Self {
            max_percent_send,
            max_percent_recv,
            duration_hours,
        }
    }

    /// Percentage cap for the given direction
    pub fn max_percent(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Send => self.max_percent_send,
            Direction::Recv => self.max_percent_recv,
        }
    }

    /// Check the policy fields a new or updated quota must satisfy
    pub fn validate(&self) -> RateLimitResult<()> {
        if self.max_percent_send > MAX_PERCENT {
            return Err(RateLimitError::InvalidRequest(format!(
                "max-percent-send percent must be between 0 and 100 (inclusively), Provided: {}",
                self.max_percent_send
            )));
        }
        if self.max_percent_recv > MAX_PERCENT {
            return Err(RateLimitError::InvalidRequest(format!(
                "max-percent-recv percent must be between 0 and 100 (inclusively), Provided: {}",
                self.max_percent_recv
            )));
        }
        if self.max_percent_send == 0 && self.max_percent_recv == 0 {
            return Err(RateLimitError::InvalidRequest(
                "either the max send or max receive threshold must be greater than 0".to_string(),
            ));
        }
        if self.duration_hours == 0 {
            return Err(RateLimitError::InvalidRequest(
                "duration can not be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the window expires at the given hour epoch
    pub fn resets_at(&self, epoch_number: u64) -> bool {
        self.duration_hours != 0 && epoch_number % self.duration_hours == 0
    }
}

/// Live counters since the last reset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flow {
    #[serde(with = "amount_serde")]
    pub inflow: Amount,

    #[serde(with = "amount_serde")]
    pub outflow: Amount,

    /// Snapshot of the channel value taken at creation, update or reset
    #[serde(with = "amount_serde")]
    pub channel_value: Amount,
}

impl Flow {
    /// Fresh window over the given channel value
    pub fn new(channel_value: Amount) -> Self {
        Self {
            inflow: Amount::zero(),
            outflow: Amount::zero(),
            channel_value,
        }
    }

    /// Counter for the given direction
    pub fn get(&self, direction: Direction) -> &Amount {
        match direction {
            Direction::Send => &self.outflow,
            Direction::Recv => &self.inflow,
        }
    }

    fn get_mut(&mut self, direction: Direction) -> &mut Amount {
        match direction {
            Direction::Send => &mut self.outflow,
            Direction::Recv => &mut self.inflow,
        }
    }

    /// Largest flow a cap of `max_percent` allows, rounded down
    pub fn threshold(&self, max_percent: u32) -> Amount {
        &self.channel_value * max_percent / MAX_PERCENT
    }
}

/// A quota together with the flow it constrains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub path: Path,
    pub quota: Quota,
    pub flow: Flow,
}

impl RateLimit {
    pub fn new(path: Path, quota: Quota, channel_value: Amount) -> Self {
        Self {
            path,
            quota,
            flow: Flow::new(channel_value),
        }
    }

    /// Compute the flow after admitting `amount`, without mutating anything
    ///
    /// Returns `QuotaExceeded` when `new_flow * 100 > max_percent * channel_value`.
    /// A zero cap disables the check for that direction.
    pub fn check_flow(&self, direction: Direction, amount: &Amount) -> RateLimitResult<Amount> {
        let new_flow = self.flow.get(direction) + amount;
        let max_percent = self.quota.max_percent(direction);
        if max_percent == 0 {
            return Ok(new_flow);
        }

        if &new_flow * MAX_PERCENT > &self.flow.channel_value * max_percent {
            return Err(RateLimitError::QuotaExceeded {
                direction,
                denom: self.path.denom.clone(),
                channel_id: self.path.channel_id.clone(),
                amount: amount.clone(),
                threshold: self.flow.threshold(max_percent),
            });
        }
        Ok(new_flow)
    }

    /// Admit `amount` into the flow, or leave the flow untouched on rejection
    pub fn update_flow(&mut self, direction: Direction, amount: &Amount) -> RateLimitResult<()> {
        let new_flow = self.check_flow(direction, amount)?;
        *self.flow.get_mut(direction) = new_flow;
        Ok(())
    }

    /// Undo a previously admitted outflow, flooring at zero
    pub fn revert_outflow(&mut self, amount: &Amount) {
        if &self.flow.outflow > amount {
            self.flow.outflow -= amount;
        } else {
            self.flow.outflow = Amount::zero();
        }
    }

    /// Start a new window over a fresh channel value
    pub fn reset_flow(&mut self, channel_value: Amount) {
        self.flow = Flow::new(channel_value);
    }
}

/// Serde helpers encoding amounts as decimal strings
///
/// Plain integers are accepted on input so hand-written TOML stays readable.
pub mod amount_serde {
    use super::Amount;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(u64),
    }

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => Ok(Amount::from(value)),
            Repr::Text(text) => Amount::parse_bytes(text.trim().as_bytes(), 10)
                .ok_or_else(|| D::Error::custom(format!("invalid amount '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: u64) -> Amount {
        Amount::from(value)
    }

    fn rate_limit(send: u32, recv: u32, channel_value: u64) -> RateLimit {
        RateLimit::new(
            Path::new("uatom", "channel-0"),
            Quota::new(send, recv, 24),
            amount(channel_value),
        )
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let mut rl = rate_limit(10, 10, 1000);

        assert!(rl.update_flow(Direction::Send, &amount(99)).is_ok());
        assert!(rl.update_flow(Direction::Send, &amount(1)).is_ok());
        assert_eq!(rl.flow.outflow, amount(100));

        let err = rl.update_flow(Direction::Send, &amount(1)).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(rl.flow.outflow, amount(100));
    }

    #[test]
    fn test_recv_uses_inflow_and_recv_cap() {
        let mut rl = rate_limit(50, 5, 1000);

        assert!(rl.update_flow(Direction::Recv, &amount(50)).is_ok());
        assert!(rl.update_flow(Direction::Recv, &amount(1)).is_err());
        assert_eq!(rl.flow.inflow, amount(50));
        assert_eq!(rl.flow.outflow, amount(0));
    }

    #[test]
    fn test_zero_cap_is_unlimited() {
        let mut rl = rate_limit(0, 10, 1000);
        assert!(rl.update_flow(Direction::Send, &amount(1_000_000)).is_ok());
        assert_eq!(rl.flow.outflow, amount(1_000_000));
    }

    #[test]
    fn test_zero_channel_value_blocks() {
        let rl = rate_limit(100, 100, 0);
        assert!(rl.check_flow(Direction::Send, &amount(1)).is_err());
        assert!(rl.check_flow(Direction::Recv, &amount(1)).is_err());
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        let huge = Amount::from(u128::MAX) * Amount::from(u128::MAX);
        let mut rl = RateLimit::new(
            Path::new("wei", "channel-9"),
            Quota::new(1, 1, 1),
            huge.clone(),
        );
        let one_percent = &huge / 100u32;
        assert!(rl.update_flow(Direction::Send, &one_percent).is_ok());
        assert!(rl.update_flow(Direction::Send, &amount(1)).is_err());
    }

    #[test]
    fn test_quota_exceeded_reports_threshold() {
        let rl = rate_limit(10, 10, 1005);
        match rl.check_flow(Direction::Send, &amount(200)) {
            Err(RateLimitError::QuotaExceeded { threshold, direction, .. }) => {
                assert_eq!(threshold, amount(100));
                assert_eq!(direction, Direction::Send);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_revert_outflow_floors_at_zero() {
        let mut rl = rate_limit(10, 10, 1000);
        rl.update_flow(Direction::Send, &amount(30)).unwrap();

        rl.revert_outflow(&amount(20));
        assert_eq!(rl.flow.outflow, amount(10));

        rl.revert_outflow(&amount(50));
        assert_eq!(rl.flow.outflow, amount(0));
    }

    #[test]
    fn test_quota_validation() {
        assert!(Quota::new(10, 10, 24).validate().is_ok());
        assert!(Quota::new(0, 10, 24).validate().is_ok());
        assert!(Quota::new(101, 10, 24).validate().is_err());
        assert!(Quota::new(10, 101, 24).validate().is_err());
        assert!(Quota::new(0, 0, 24).validate().is_err());
        assert!(Quota::new(10, 10, 0).validate().is_err());
    }

    #[test]
    fn test_resets_at() {
        let daily = Quota::new(10, 10, 24);
        let five = Quota::new(10, 10, 5);
        let never = Quota::new(10, 10, 0);

        assert!(daily.resets_at(48));
        assert!(!five.resets_at(48));
        assert!(!never.resets_at(48));
        assert!(!never.resets_at(0));
    }

    #[test]
    fn test_flow_amounts_serialize_as_strings() {
        let flow = Flow {
            inflow: amount(5),
            outflow: amount(7),
            channel_value: Amount::from(u128::MAX),
        };
        let json = serde_json::to_string(&flow).unwrap();
        assert!(json.contains("\"outflow\":\"7\""));
        assert!(json.contains(&u128::MAX.to_string()));

        let parsed: Flow =
            serde_json::from_str(r#"{"inflow":0,"outflow":"12","channel_value":1000}"#).unwrap();
        assert_eq!(parsed.outflow, amount(12));
        assert_eq!(parsed.channel_value, amount(1000));
    }
}
