//! Hour Epoch Clock
//!
//! Turns block timestamps into a gap-free, monotonically increasing epoch
//! number. The epoch advances at most once per block, so a long gap between
//! blocks is caught up one epoch at a time over the following blocks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::host::EpochProvider;
use super::quota::Path;

/// Default epoch length: one hour
pub const DEFAULT_EPOCH_DURATION_SECS: u64 = 3600;

/// Hour epoch tracking state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourEpoch {
    /// Number of the epoch currently running
    pub epoch_number: u64,

    /// Epoch length in seconds
    pub duration_secs: u64,

    /// Start of the current epoch; anchored to the first block seen when unset
    #[serde(default)]
    pub epoch_start_time: Option<DateTime<Utc>>,
}

impl Default for HourEpoch {
    fn default() -> Self {
        Self::new(DEFAULT_EPOCH_DURATION_SECS)
    }
}

impl HourEpoch {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            epoch_number: 0,
            duration_secs,
            epoch_start_time: None,
        }
    }

    fn duration(&self) -> Option<Duration> {
        i64::try_from(self.duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
    }

    /// Start time of the next epoch, if the clock has been anchored
    pub fn next_epoch_start(&self) -> Option<DateTime<Utc>> {
        let duration = self.duration()?;
        self.epoch_start_time
            .and_then(|start| start.checked_add_signed(duration))
    }

    /// Advance the clock to `block_time`
    ///
    /// Returns the new epoch number when a new epoch starts with this block.
    pub fn check_epoch_starting(&mut self, block_time: DateTime<Utc>) -> Option<u64> {
        let Some(next_start) = self.next_epoch_start() else {
            if self.epoch_start_time.is_none() {
                self.epoch_start_time = Some(block_time);
            }
            return None;
        };

        if block_time < next_start {
            return None;
        }

        self.epoch_number += 1;
        self.epoch_start_time = Some(next_start);
        Some(self.epoch_number)
    }
}

impl EpochProvider for HourEpoch {
    fn current_epoch_number(&self) -> u64 {
        self.epoch_number
    }
}

/// Outcome of one epoch tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpochReport {
    pub epoch_number: u64,

    /// Rate limits whose window was reset
    pub reset: Vec<Path>,

    /// Rate limits that were due but could not be reset, with the reason
    pub failed: Vec<(Path, String)>,
}
