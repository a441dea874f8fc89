//! Administration Requests
//!
//! Typed add/update/remove/reset requests and their stateless validation.
//! Stateful checks (existence, channel value) live in the manager.

use serde::{Deserialize, Serialize};

use super::error::{RateLimitError, RateLimitResult};
use super::quota::{Path, Quota};

/// Channel ids must look like `channel-{N}`
pub fn validate_channel_id(channel_id: &str) -> RateLimitResult<()> {
    let valid = channel_id
        .strip_prefix("channel-")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(RateLimitError::InvalidRequest(format!(
            "invalid channel-id ({}), must be of the format 'channel-{{N}}'",
            channel_id
        )))
    }
}

fn validate_target(authority: &str, denom: &str, channel_id: &str) -> RateLimitResult<()> {
    if authority.is_empty() {
        return Err(RateLimitError::InvalidRequest(
            "invalid authority address (empty)".to_string(),
        ));
    }
    if denom.is_empty() {
        return Err(RateLimitError::InvalidRequest(format!(
            "invalid denom ({})",
            denom
        )));
    }
    validate_channel_id(channel_id)
}

/// Create a rate limit for a new `(denom, channel_id)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRateLimit {
    pub authority: String,
    pub denom: String,
    pub channel_id: String,
    pub max_percent_send: u32,
    pub max_percent_recv: u32,
    pub duration_hours: u64,
}

impl AddRateLimit {
    pub fn path(&self) -> Path {
        Path::new(&self.denom, &self.channel_id)
    }

    pub fn quota(&self) -> Quota {
        Quota::new(self.max_percent_send, self.max_percent_recv, self.duration_hours)
    }

    pub fn validate_basic(&self) -> RateLimitResult<()> {
        validate_target(&self.authority, &self.denom, &self.channel_id)?;
        self.quota().validate()
    }
}

/// Replace the quota of an existing rate limit, restarting its window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRateLimit {
    pub authority: String,
    pub denom: String,
    pub channel_id: String,
    pub max_percent_send: u32,
    pub max_percent_recv: u32,
    pub duration_hours: u64,
}

impl UpdateRateLimit {
    pub fn path(&self) -> Path {
        Path::new(&self.denom, &self.channel_id)
    }

    pub fn quota(&self) -> Quota {
        Quota::new(self.max_percent_send, self.max_percent_recv, self.duration_hours)
    }

    pub fn validate_basic(&self) -> RateLimitResult<()> {
        validate_target(&self.authority, &self.denom, &self.channel_id)?;
        self.quota().validate()
    }
}

/// Delete a rate limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRateLimit {
    pub authority: String,
    pub denom: String,
    pub channel_id: String,
}

impl RemoveRateLimit {
    pub fn validate_basic(&self) -> RateLimitResult<()> {
        validate_target(&self.authority, &self.denom, &self.channel_id)
    }
}

/// Zero the flow of a rate limit on demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRateLimit {
    pub authority: String,
    pub denom: String,
    pub channel_id: String,
}

impl ResetRateLimit {
    pub fn validate_basic(&self) -> RateLimitResult<()> {
        validate_target(&self.authority, &self.denom, &self.channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add() -> AddRateLimit {
        AddRateLimit {
            authority: "gov".to_string(),
            denom: "denom".to_string(),
            channel_id: "channel-0".to_string(),
            max_percent_send: 10,
            max_percent_recv: 10,
            duration_hours: 60,
        }
    }

    fn assert_invalid(result: RateLimitResult<()>, needle: &str) {
        match result {
            Err(RateLimitError::InvalidRequest(msg)) => {
                assert!(msg.contains(needle), "'{}' does not mention '{}'", msg, needle)
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_channel_id_format() {
        assert!(validate_channel_id("channel-0").is_ok());
        assert!(validate_channel_id("channel-1234").is_ok());
        assert!(validate_channel_id("channel-").is_err());
        assert!(validate_channel_id("channel-1a").is_err());
        assert!(validate_channel_id("chan-1").is_err());
        assert!(validate_channel_id("").is_err());
    }

    #[test]
    fn test_add_valid() {
        assert!(add().validate_basic().is_ok());
    }

    #[test]
    fn test_add_invalid_fields() {
        assert_invalid(
            AddRateLimit { authority: String::new(), ..add() }.validate_basic(),
            "invalid authority",
        );
        assert_invalid(
            AddRateLimit { denom: String::new(), ..add() }.validate_basic(),
            "invalid denom",
        );
        assert_invalid(
            AddRateLimit { channel_id: "channel-".to_string(), ..add() }.validate_basic(),
            "invalid channel-id",
        );
        assert_invalid(
            AddRateLimit { max_percent_send: 101, ..add() }.validate_basic(),
            "percent must be between 0 and 100",
        );
        assert_invalid(
            AddRateLimit { max_percent_recv: 101, ..add() }.validate_basic(),
            "percent must be between 0 and 100",
        );
        assert_invalid(
            AddRateLimit { max_percent_send: 0, max_percent_recv: 0, ..add() }.validate_basic(),
            "must be greater than 0",
        );
        assert_invalid(
            AddRateLimit { duration_hours: 0, ..add() }.validate_basic(),
            "duration can not be zero",
        );
    }

    #[test]
    fn test_add_one_sided_quota() {
        assert!(AddRateLimit { max_percent_send: 0, ..add() }.validate_basic().is_ok());
        assert!(AddRateLimit { max_percent_recv: 0, ..add() }.validate_basic().is_ok());
    }

    #[test]
    fn test_update_rejects_zero_duration() {
        let update = UpdateRateLimit {
            authority: "gov".to_string(),
            denom: "denom".to_string(),
            channel_id: "channel-0".to_string(),
            max_percent_send: 10,
            max_percent_recv: 10,
            duration_hours: 0,
        };
        assert_invalid(update.validate_basic(), "duration can not be zero");
    }

    #[test]
    fn test_remove_and_reset_validation() {
        let remove = RemoveRateLimit {
            authority: "gov".to_string(),
            denom: "denom".to_string(),
            channel_id: "channel-0".to_string(),
        };
        assert!(remove.validate_basic().is_ok());

        let reset = ResetRateLimit {
            authority: "gov".to_string(),
            denom: "denom".to_string(),
            channel_id: "channel-x".to_string(),
        };
        assert_invalid(reset.validate_basic(), "invalid channel-id");
    }
}
