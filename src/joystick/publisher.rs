//! # Event Publisher Module
//!
//! Delivers joystick positions to the input consumer on the axis pair and
//! button selected by the device's [`Side`].
//!
//! ## Identifiers per side
//!
//! | Side  | X axis  | Y axis  | Button       |
//! |-------|---------|---------|--------------|
//! | Left  | ABS_X   | ABS_Y   | BTN_THUMBL   |
//! | Right | ABS_RX  | ABS_RY  | BTN_THUMBR   |
//!
//! Every publish is one [`EventFrame`]: both axes and the button, committed
//! together by the sink with a single sync.

use evdev::{AbsoluteAxisType, Key};
use serde::{Deserialize, Serialize};

use crate::error::{JoystickError, Result};
use crate::joystick::state::DeviceState;

/// Which half of a combined controller this joystick represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    #[serde(alias = "l")]
    Left,
    #[serde(alias = "r")]
    Right,
}

impl Side {
    /// Axis identifiers (x, y) for this side
    #[must_use]
    pub fn axes(self) -> (AbsoluteAxisType, AbsoluteAxisType) {
        match self {
            Side::Left => (AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y),
            Side::Right => (AbsoluteAxisType::ABS_RX, AbsoluteAxisType::ABS_RY),
        }
    }

    /// Button identifier for this side
    #[must_use]
    pub fn button(self) -> Key {
        match self {
            Side::Left => Key::BTN_THUMBL,
            Side::Right => Key::BTN_THUMBR,
        }
    }

    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Single-character form used by the management surface
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Side::Left => 'l',
            Side::Right => 'r',
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// Parse management input; only the leading character is significant.
    ///
    /// # Examples
    ///
    /// ```
    /// use fpga_joystick::joystick::publisher::Side;
    ///
    /// assert_eq!(Side::from_leading_char("r\n")?, Side::Right);
    /// assert_eq!(Side::from_leading_char("left")?, Side::Left);
    /// assert!(Side::from_leading_char("x").is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_leading_char(input: &str) -> Result<Side> {
        match input.chars().next() {
            Some('l') => Ok(Side::Left),
            Some('r') => Ok(Side::Right),
            _ => Err(JoystickError::InvalidSide(input.to_string())),
        }
    }
}

/// Input capabilities the consumer should advertise
///
/// Only the identifiers of `side` are armed; the opposite side's axes and
/// button are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCapabilities {
    pub side: Side,
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub flat: i32,
}

impl InputCapabilities {
    #[must_use]
    pub fn for_state(state: &DeviceState) -> Self {
        Self {
            side: state.side,
            min: state.min,
            max: state.max,
            fuzz: state.fuzz,
            flat: 0,
        }
    }

    #[must_use]
    pub fn active_axes(&self) -> (AbsoluteAxisType, AbsoluteAxisType) {
        self.side.axes()
    }

    #[must_use]
    pub fn active_button(&self) -> Key {
        self.side.button()
    }

    #[must_use]
    pub fn cleared_axes(&self) -> (AbsoluteAxisType, AbsoluteAxisType) {
        self.side.opposite().axes()
    }

    #[must_use]
    pub fn cleared_button(&self) -> Key {
        self.side.opposite().button()
    }
}

/// One reporting unit: both axes plus the button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFrame {
    pub x_axis: AbsoluteAxisType,
    pub y_axis: AbsoluteAxisType,
    pub button: Key,
    pub x: i32,
    pub y: i32,
    pub pressed: bool,
}

impl EventFrame {
    #[must_use]
    pub fn new(side: Side, x: i32, y: i32, pressed: bool) -> Self {
        let (x_axis, y_axis) = side.axes();
        Self {
            x_axis,
            y_axis,
            button: side.button(),
            x,
            y,
            pressed,
        }
    }
}

/// Consumer of joystick events
///
/// Implementations must commit each frame atomically (all three values then
/// a sync) so a reader never observes a partial update.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send {
    /// Arm the identifiers for `caps.side` and clear the opposite side
    fn configure(&mut self, caps: &InputCapabilities) -> Result<()>;

    /// Emit one frame followed by a sync
    fn emit(&mut self, frame: &EventFrame) -> Result<()>;
}

/// Routes positions to the sink according to the device side
pub struct EventPublisher {
    sink: Box<dyn EventSink>,
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher").finish_non_exhaustive()
    }
}

impl EventPublisher {
    pub fn new(sink: Box<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Reapply the input capabilities for the state's current side
    pub fn apply_capabilities(&mut self, state: &DeviceState) -> Result<()> {
        self.sink.configure(&InputCapabilities::for_state(state))
    }

    /// Publish a position on the axis pair selected by `state.side`
    ///
    /// The side is read once, so the whole frame carries one side's
    /// identifiers.
    pub fn publish(&mut self, state: &DeviceState, x: i32, y: i32, button: bool) -> Result<()> {
        let frame = EventFrame::new(state.side, x, y, button);
        self.sink.emit(&frame)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that records everything it is asked to do
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub frames: Arc<Mutex<Vec<EventFrame>>>,
        pub configurations: Arc<Mutex<Vec<InputCapabilities>>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_frames(&self) -> Vec<EventFrame> {
            self.frames.lock().unwrap().clone()
        }

        pub fn get_configurations(&self) -> Vec<InputCapabilities> {
            self.configurations.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn configure(&mut self, caps: &InputCapabilities) -> Result<()> {
            self.configurations.lock().unwrap().push(*caps);
            Ok(())
        }

        fn emit(&mut self, frame: &EventFrame) -> Result<()> {
            self.frames.lock().unwrap().push(*frame);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::RecordingSink;
    use super::*;
    use crate::config::{DefaultsConfig, DeviceConfig, DeviceDescriptor};

    fn state(side: Side) -> DeviceState {
        let mut descriptor = DeviceDescriptor::new("test", 1, 0x52);
        descriptor.side = side;
        DeviceState::new(&DeviceConfig::resolve(&DefaultsConfig::default(), &descriptor))
    }

    #[test]
    fn test_side_identifiers() {
        assert_eq!(
            Side::Left.axes(),
            (AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y)
        );
        assert_eq!(Side::Left.button(), Key::BTN_THUMBL);
        assert_eq!(
            Side::Right.axes(),
            (AbsoluteAxisType::ABS_RX, AbsoluteAxisType::ABS_RY)
        );
        assert_eq!(Side::Right.button(), Key::BTN_THUMBR);
    }

    #[test]
    fn test_side_chars() {
        assert_eq!(Side::Left.as_char(), 'l');
        assert_eq!(Side::Right.as_char(), 'r');
        assert_eq!(Side::default(), Side::Left);
        assert_eq!(Side::Left.opposite(), Side::Right);
    }

    #[test]
    fn test_side_from_leading_char() {
        assert_eq!(Side::from_leading_char("l").unwrap(), Side::Left);
        assert_eq!(Side::from_leading_char("r\n").unwrap(), Side::Right);
        assert_eq!(Side::from_leading_char("rubbish").unwrap(), Side::Right);
    }

    #[test]
    fn test_side_rejects_bad_input() {
        for input in ["", "x", "L", " r", "\n"] {
            assert!(
                matches!(Side::from_leading_char(input), Err(JoystickError::InvalidSide(_))),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_capabilities_clear_opposite_side() {
        let caps = InputCapabilities::for_state(&state(Side::Right));
        assert_eq!(caps.active_button(), Key::BTN_THUMBR);
        assert_eq!(caps.cleared_button(), Key::BTN_THUMBL);
        assert_eq!(
            caps.cleared_axes(),
            (AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y)
        );
        assert_eq!((caps.min, caps.max, caps.fuzz, caps.flat), (0, 4095, 32, 0));
    }

    #[test]
    fn test_publish_uses_state_side() {
        let sink = RecordingSink::new();
        let mut publisher = EventPublisher::new(Box::new(sink.clone()));

        publisher.publish(&state(Side::Left), 10, 20, false).unwrap();
        publisher.publish(&state(Side::Right), 30, 40, true).unwrap();

        let frames = sink.get_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], EventFrame::new(Side::Left, 10, 20, false));
        assert_eq!(frames[1].x_axis, AbsoluteAxisType::ABS_RX);
        assert_eq!(frames[1].y_axis, AbsoluteAxisType::ABS_RY);
        assert_eq!(frames[1].button, Key::BTN_THUMBR);
        assert_eq!((frames[1].x, frames[1].y, frames[1].pressed), (30, 40, true));
    }

    #[test]
    fn test_apply_capabilities_forwards_side() {
        let sink = RecordingSink::new();
        let mut publisher = EventPublisher::new(Box::new(sink.clone()));

        publisher.apply_capabilities(&state(Side::Right)).unwrap();
        assert_eq!(sink.get_configurations()[0].side, Side::Right);
    }

    #[test]
    fn test_publish_propagates_sink_error() {
        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .times(1)
            .returning(|_| Err(JoystickError::Publisher("device gone".to_string())));

        let mut publisher = EventPublisher::new(Box::new(sink));
        let result = publisher.publish(&state(Side::Left), 1, 2, false);
        assert!(matches!(result, Err(JoystickError::Publisher(_))));
    }
}
