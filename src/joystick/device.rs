//! # Joystick Device Module
//!
//! Couples a joystick's [`DeviceState`] with its [`EventPublisher`].
//!
//! One `JoystickDevice` lives behind a [`SharedDevice`] lock. The poll cycle
//! takes the lock for calibrate → normalize → publish, and the management
//! surface takes it for side changes and injection, so a publish always sees
//! a single side value.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bus::protocol::RawSample;
use crate::config::DeviceConfig;
use crate::error::{JoystickError, Result};
use crate::joystick::calibration::{maybe_calibrate, normalize_axis};
use crate::joystick::publisher::{EventPublisher, EventSink, Side};
use crate::joystick::state::DeviceState;
use crate::poll::backoff::FAILURE_THRESHOLD;

/// Device guarded by the lock shared between the poll cycle and management
pub type SharedDevice = Arc<Mutex<JoystickDevice>>;

/// State and publisher of one joystick
#[derive(Debug)]
pub struct JoystickDevice {
    state: DeviceState,
    publisher: EventPublisher,
    /// Consecutive publishes rejected by the consumer
    publish_failures: u32,
}

impl JoystickDevice {
    /// Create the device and apply the initial input capabilities
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the capabilities cannot be applied. The
    /// sink is dropped before returning.
    pub fn new(config: &DeviceConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        let state = DeviceState::new(config);
        let mut publisher = EventPublisher::new(sink);
        publisher.apply_capabilities(&state)?;

        Ok(Self {
            state,
            publisher,
            publish_failures: 0,
        })
    }

    pub fn into_shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Handle a successful bus read
    ///
    /// Resets the failure count, captures the center if calibration is
    /// pending, then publishes the normalized position.
    pub fn on_sample(&mut self, sample: RawSample) -> Result<()> {
        let state = &mut self.state;
        state.backoff.record_success();
        state.last_sample_at = Some(Utc::now());

        if maybe_calibrate(state, sample.x, sample.y) {
            info!(
                "calibrated {} joystick to mid point 0x{:x},0x{:x}",
                state.side.name(),
                state.center_x,
                state.center_y
            );
        }

        let x = normalize_axis(sample.x, state.min, state.center_x, state.max);
        let y = normalize_axis(sample.y, state.min, state.center_y, state.max);
        debug!(raw_x = sample.x, raw_y = sample.y, x, y, "publishing sample");

        self.publisher.publish(&self.state, x, y, sample.button)?;
        self.publish_failures = 0;
        Ok(())
    }

    /// Count a publish rejected by the consumer
    ///
    /// Warns for the first five in a row, then stays quiet until a publish
    /// succeeds.
    pub fn on_publish_failure(&mut self, error: &JoystickError) {
        self.publish_failures = self.publish_failures.saturating_add(1);
        if self.publish_failures > FAILURE_THRESHOLD {
            return;
        }

        warn!(
            "Failed to publish joystick event: {} (consecutive failures: {})",
            error, self.publish_failures
        );
        if self.publish_failures == FAILURE_THRESHOLD {
            warn!("Suppressing further publish warnings until the consumer recovers");
        }
    }

    #[must_use]
    pub fn publish_failures(&self) -> u32 {
        self.publish_failures
    }

    /// Handle a failed bus read: count it and nothing is published
    ///
    /// Only the 2nd to 5th consecutive failure is logged.
    pub fn on_failure(&mut self, error: &JoystickError) {
        let failures = self.state.backoff.record_failure();
        if self.state.backoff.should_warn() {
            warn!("{} (consecutive failures: {})", error, failures);
        }
    }

    /// Switch side and reapply the input capabilities for it
    ///
    /// The side is committed only once the consumer accepts the new
    /// capabilities; on error the device keeps its previous side.
    pub fn set_side(&mut self, side: Side) -> Result<()> {
        let mut next = self.state.clone();
        next.side = side;
        self.publisher.apply_capabilities(&next)?;

        self.state.side = side;
        Ok(())
    }

    /// Publish literal values, bypassing calibration and normalization
    pub fn inject(&mut self, x: i32, y: i32, button: bool) -> Result<()> {
        self.publisher.publish(&self.state, x, y, button)
    }

    /// Capture the next successful sample as the new center
    pub fn request_calibration(&mut self) {
        self.state.calibration_pending = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultsConfig, DeviceDescriptor};
    use crate::joystick::publisher::mocks::RecordingSink;
    use crate::joystick::publisher::{EventFrame, MockEventSink};
    use crate::poll::backoff::PollState;

    fn config(calibrate: bool) -> DeviceConfig {
        let mut descriptor = DeviceDescriptor::new("test", 1, 0x52);
        descriptor.calibrate = calibrate;
        DeviceConfig::resolve(&DefaultsConfig::default(), &descriptor)
    }

    fn sample(x: i32, y: i32) -> RawSample {
        RawSample { x, y, button: false }
    }

    #[test]
    fn test_new_applies_capabilities() {
        let sink = RecordingSink::new();
        JoystickDevice::new(&config(false), Box::new(sink.clone())).unwrap();

        let configs = sink.get_configurations();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].side, Side::Left);
    }

    #[test]
    fn test_new_fails_when_sink_rejects_capabilities() {
        let mut sink = MockEventSink::new();
        sink.expect_configure()
            .returning(|_| Err(JoystickError::Publisher("no uinput".to_string())));

        let result = JoystickDevice::new(&config(false), Box::new(sink));
        assert!(matches!(result, Err(JoystickError::Publisher(_))));
    }

    #[test]
    fn test_sample_is_normalized_and_published() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(false), Box::new(sink.clone())).unwrap();

        // Uncalibrated center is 2047 on 0..4095
        device.on_sample(sample(2047, 0)).unwrap();

        let frames = sink.get_frames();
        assert_eq!(frames, vec![EventFrame::new(Side::Left, 2047, 0, false)]);
        assert!(device.state().last_sample_at.is_some());
    }

    #[test]
    fn test_first_sample_calibrates() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(true), Box::new(sink.clone())).unwrap();

        device.on_sample(sample(1800, 2300)).unwrap();
        assert_eq!(device.state().center_x, 1800);
        assert_eq!(device.state().center_y, 2300);
        assert!(!device.state().calibration_pending);

        // Rest position maps to the ideal midpoint
        assert_eq!(sink.get_frames()[0].x, 2047);
        assert_eq!(sink.get_frames()[0].y, 2047);
    }

    #[test]
    fn test_failure_does_not_clear_calibration() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(true), Box::new(sink.clone())).unwrap();

        device.on_failure(&JoystickError::Bus("timeout".to_string()));
        assert!(device.state().calibration_pending);
        assert!(sink.get_frames().is_empty());
        assert_eq!(device.state().backoff.consecutive_failures(), 1);
    }

    #[test]
    fn test_success_resets_failures() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(false), Box::new(sink)).unwrap();

        for _ in 0..7 {
            device.on_failure(&JoystickError::Bus("timeout".to_string()));
        }
        assert_eq!(device.state().backoff.state(), PollState::Degraded);

        device.on_sample(sample(100, 100)).unwrap();
        assert_eq!(device.state().backoff.consecutive_failures(), 0);
        assert_eq!(device.state().backoff.state(), PollState::Normal);
    }

    #[test]
    fn test_set_side_reconfigures_and_switches_identifiers() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(false), Box::new(sink.clone())).unwrap();

        device.set_side(Side::Right).unwrap();
        device.on_sample(sample(2047, 2047)).unwrap();

        let configs = sink.get_configurations();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].side, Side::Right);

        let frames = sink.get_frames();
        assert_eq!(frames, vec![EventFrame::new(Side::Right, 2047, 2047, false)]);
    }

    #[test]
    fn test_inject_bypasses_normalization() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(true), Box::new(sink.clone())).unwrap();

        device.inject(10, 20, true).unwrap();
        assert_eq!(sink.get_frames(), vec![EventFrame::new(Side::Left, 10, 20, true)]);
        // Injection never calibrates
        assert!(device.state().calibration_pending);
    }

    #[test]
    fn test_request_calibration_rearms() {
        let sink = RecordingSink::new();
        let mut device = JoystickDevice::new(&config(false), Box::new(sink)).unwrap();

        device.request_calibration();
        device.on_sample(sample(1000, 1100)).unwrap();
        assert_eq!(device.state().center_x, 1000);
        assert_eq!(device.state().center_y, 1100);
    }

    #[test]
    fn test_failed_side_change_keeps_previous_side() {
        let mut sink = MockEventSink::new();
        let mut configures = 0;
        sink.expect_configure().times(2).returning(move |_| {
            configures += 1;
            if configures == 1 {
                Ok(())
            } else {
                Err(JoystickError::Publisher("uinput rebuild failed".to_string()))
            }
        });
        sink.expect_emit()
            .withf(|frame| *frame == EventFrame::new(Side::Left, 2047, 2047, false))
            .times(1)
            .returning(|_| Ok(()));

        let mut device = JoystickDevice::new(&config(false), Box::new(sink)).unwrap();

        let result = device.set_side(Side::Right);
        assert!(matches!(result, Err(JoystickError::Publisher(_))));
        assert_eq!(device.state().side, Side::Left);

        // The previous side keeps publishing
        device.on_sample(sample(2047, 2047)).unwrap();
    }

    #[test]
    fn test_publish_failures_reset_on_success() {
        let mut sink = MockEventSink::new();
        let mut emits = 0;
        sink.expect_configure().returning(|_| Ok(()));
        sink.expect_emit().returning(move |_| {
            emits += 1;
            if emits <= 8 {
                Err(JoystickError::Publisher("device gone".to_string()))
            } else {
                Ok(())
            }
        });

        let mut device = JoystickDevice::new(&config(false), Box::new(sink)).unwrap();
        for _ in 0..8 {
            let err = device.on_sample(sample(1, 1)).unwrap_err();
            device.on_publish_failure(&err);
        }
        assert_eq!(device.publish_failures(), 8);
        // Publish errors never count against the bus
        assert_eq!(device.state().backoff.consecutive_failures(), 0);

        device.on_sample(sample(1, 1)).unwrap();
        assert_eq!(device.publish_failures(), 0);
    }
}
