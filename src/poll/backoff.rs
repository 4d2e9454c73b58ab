//! Failure counting and adaptive poll interval.
//!
//! The poller runs in one of two states:
//!
//! - **Normal**: fewer than [`FAILURE_THRESHOLD`] consecutive bus failures,
//!   next tick after the configured poll interval.
//! - **Degraded**: at or above the threshold, next tick after
//!   [`DEGRADED_INTERVAL`] however large the count grows.
//!
//! A single successful read resets the count and returns to Normal.

use serde::Serialize;
use std::time::Duration;

/// Consecutive failures that switch polling to the degraded interval
pub const FAILURE_THRESHOLD: u32 = 5;

/// Poll interval while degraded
pub const DEGRADED_INTERVAL: Duration = Duration::from_secs(10);

/// Scheduling state derived from the failure count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Normal,
    Degraded,
}

/// Consecutive-failure counter with the intervals it selects between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    consecutive_failures: u32,
    normal: Duration,
    degraded: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(normal: Duration) -> Self {
        Self::with_intervals(normal, DEGRADED_INTERVAL)
    }

    #[must_use]
    pub fn with_intervals(normal: Duration, degraded: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            normal,
            degraded,
        }
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    #[must_use]
    pub fn normal_interval(&self) -> Duration {
        self.normal
    }

    #[must_use]
    pub fn degraded_interval(&self) -> Duration {
        self.degraded
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count one failure and return the new count
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Warn on the 2nd through 5th consecutive failure only
    #[must_use]
    pub fn should_warn(&self) -> bool {
        self.consecutive_failures > 1 && self.consecutive_failures <= FAILURE_THRESHOLD
    }

    #[must_use]
    pub fn state(&self) -> PollState {
        if self.consecutive_failures < FAILURE_THRESHOLD {
            PollState::Normal
        } else {
            PollState::Degraded
        }
    }

    /// Delay before the next tick
    #[must_use]
    pub fn next_interval(&self) -> Duration {
        match self.state() {
            PollState::Normal => self.normal,
            PollState::Degraded => self.degraded,
        }
    }
}
