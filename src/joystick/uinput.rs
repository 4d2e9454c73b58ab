//! # uinput Sink Module
//!
//! Publishes joystick frames through a Linux uinput virtual device using
//! evdev.
//!
//! ## Device identity
//!
//! - Name: `rdfpgajoy`
//! - Bus type: I2C
//! - Vendor / product / version: 0x0001
//!
//! uinput capabilities are fixed once the device is created, so every call to
//! [`EventSink::configure`] builds a new virtual device that advertises only
//! the requested side and then replaces the current one. A failed build leaves
//! the current device in service.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AttributeSet, BusType, EventType, InputEvent, InputId, Key, UinputAbsSetup};
use tracing::{debug, info};

use crate::error::{JoystickError, Result};
use crate::joystick::calibration::midpoint;
use crate::joystick::publisher::{EventFrame, EventSink, InputCapabilities};

/// Name advertised by the virtual input device
pub const DEVICE_NAME: &str = "rdfpgajoy";

const VENDOR_ID: u16 = 0x0001;
const PRODUCT_ID: u16 = 0x0001;
const VERSION: u16 = 0x0001;

/// Event sink backed by a uinput virtual device
pub struct UinputSink {
    device: Option<VirtualDevice>,
    name: String,
}

impl std::fmt::Debug for UinputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputSink")
            .field("name", &self.name)
            .field("configured", &self.device.is_some())
            .finish()
    }
}

impl Default for UinputSink {
    fn default() -> Self {
        Self::new(DEVICE_NAME)
    }
}

impl UinputSink {
    /// Create an unconfigured sink; no device exists until `configure`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device: None,
            name: name.into(),
        }
    }

    fn build_device(&self, caps: &InputCapabilities) -> std::io::Result<VirtualDevice> {
        let (x_axis, y_axis) = caps.active_axes();
        let abs = || AbsInfo::new(midpoint(caps.min, caps.max), caps.min, caps.max, caps.fuzz, caps.flat, 0);

        let mut keys = AttributeSet::<Key>::new();
        keys.insert(caps.active_button());

        VirtualDeviceBuilder::new()?
            .name(&self.name)
            .input_id(InputId::new(BusType::BUS_I2C, VENDOR_ID, PRODUCT_ID, VERSION))
            .with_keys(&keys)?
            .with_absolute_axis(&UinputAbsSetup::new(x_axis, abs()))?
            .with_absolute_axis(&UinputAbsSetup::new(y_axis, abs()))?
            .build()
    }
}

impl EventSink for UinputSink {
    fn configure(&mut self, caps: &InputCapabilities) -> Result<()> {
        // The current device stays in place if the rebuild fails
        let device = self
            .build_device(caps)
            .map_err(|e| JoystickError::Publisher(format!("Failed to create uinput device: {}", e)))?;

        if self.device.replace(device).is_some() {
            debug!("Replaced {} virtual device", self.name);
        }

        info!(
            "Created {} virtual device for {} joystick (range {}..={}, fuzz {})",
            self.name,
            caps.side.name(),
            caps.min,
            caps.max,
            caps.fuzz
        );

        Ok(())
    }

    fn emit(&mut self, frame: &EventFrame) -> Result<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| JoystickError::Publisher("virtual device not configured".to_string()))?;

        // VirtualDevice::emit appends the SYN_REPORT that commits the frame
        let events = [
            InputEvent::new(EventType::ABSOLUTE, frame.x_axis.0, frame.x),
            InputEvent::new(EventType::ABSOLUTE, frame.y_axis.0, frame.y),
            InputEvent::new(EventType::KEY, frame.button.code(), i32::from(frame.pressed)),
        ];

        device.emit(&events)?;
        Ok(())
    }
}
