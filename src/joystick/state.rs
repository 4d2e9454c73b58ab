//! Per-device joystick state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DeviceConfig;
use crate::joystick::calibration::midpoint;
use crate::joystick::publisher::Side;
use crate::poll::backoff::{Backoff, PollState};

/// Mutable state of one joystick, shared by the poll cycle and the
/// management surface behind the device lock.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub name: String,
    pub side: Side,
    /// Capture the next successful sample as the center point
    pub calibration_pending: bool,
    pub center_x: i32,
    pub center_y: i32,
    pub min: i32,
    pub max: i32,
    /// Passed through to the consumer, not used by normalization
    pub fuzz: i32,
    pub backoff: Backoff,
    pub last_sample_at: Option<DateTime<Utc>>,
}

impl DeviceState {
    /// Build the startup state from a resolved device config
    ///
    /// Centers start at the range midpoint until calibration replaces them.
    #[must_use]
    pub fn new(config: &DeviceConfig) -> Self {
        let mid = midpoint(config.min, config.max);
        Self {
            name: config.name.clone(),
            side: config.side,
            calibration_pending: config.calibrate,
            center_x: mid,
            center_y: mid,
            min: config.min,
            max: config.max,
            fuzz: config.fuzz,
            backoff: Backoff::new(config.poll_interval()),
            last_sample_at: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            name: self.name.clone(),
            side: self.side,
            calibration_pending: self.calibration_pending,
            center_x: self.center_x,
            center_y: self.center_y,
            min: self.min,
            max: self.max,
            fuzz: self.fuzz,
            consecutive_failures: self.backoff.consecutive_failures(),
            poll_state: self.backoff.state(),
            poll_interval_ms: self.backoff.next_interval().as_millis() as u64,
            last_sample_at: self.last_sample_at,
        }
    }
}

/// Snapshot reported by the `status` management attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub name: String,
    pub side: Side,
    pub calibration_pending: bool,
    pub center_x: i32,
    pub center_y: i32,
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub consecutive_failures: u32,
    pub poll_state: PollState,
    pub poll_interval_ms: u64,
    pub last_sample_at: Option<DateTime<Utc>>,
}
