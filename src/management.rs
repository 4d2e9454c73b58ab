//! # Management Module
//!
//! Runtime control of a probed joystick.
//!
//! ## Attributes
//!
//! | Name           | Access     | Read             | Write |
//! |----------------|------------|------------------|-------|
//! | `side`         | read/write | `l\n` or `r\n`   | leading `l` or `r` |
//! | `inject_event` | write-only | -                | `"<x> <y> <btn>"` |
//! | `calibrate`    | write-only | -                | anything, re-arms calibration |
//! | `status`       | read-only  | JSON snapshot    | - |
//!
//! Attribute names map to typed handlers through [`Attribute`]; there is no
//! string-keyed dispatch past [`Attribute::from_str`].
//!
//! ## Command lines
//!
//! The binary accepts one request per line:
//!
//! ```text
//! <device> <attribute>            read
//! <device> <attribute> <value>    write
//! ```

use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{JoystickError, Result};
use crate::joystick::device::SharedDevice;
use crate::joystick::publisher::Side;
use crate::joystick::state::DeviceStatus;

/// Access mode of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    #[must_use]
    pub fn can_read(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// Management attributes exposed per device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Side,
    InjectEvent,
    Calibrate,
    Status,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Side,
        Attribute::InjectEvent,
        Attribute::Calibrate,
        Attribute::Status,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Side => "side",
            Attribute::InjectEvent => "inject_event",
            Attribute::Calibrate => "calibrate",
            Attribute::Status => "status",
        }
    }

    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Attribute::Side => Access::ReadWrite,
            Attribute::InjectEvent | Attribute::Calibrate => Access::WriteOnly,
            Attribute::Status => Access::ReadOnly,
        }
    }
}

impl FromStr for Attribute {
    type Err = JoystickError;

    fn from_str(s: &str) -> Result<Self> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| JoystickError::UnknownAttribute(s.to_string()))
    }
}

/// Parse `"<x> <y> <btn>"`
///
/// The first three whitespace-separated fields must be integers; anything
/// after them is ignored.
///
/// # Examples
///
/// ```
/// use fpga_joystick::management::parse_injection;
///
/// assert_eq!(parse_injection("10 20 1")?, (10, 20, 1));
/// assert!(parse_injection("10 20").is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_injection(input: &str) -> Result<(i32, i32, i32)> {
    let malformed = || JoystickError::MalformedInjection(input.trim_end().to_string());

    let mut fields = input.split_whitespace().map(str::parse::<i32>);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(btn))) => Ok((x, y, btn)),
        _ => Err(malformed()),
    }
}

/// Typed handlers for one device's attributes
#[derive(Debug, Clone)]
pub struct ManagementInterface {
    device: SharedDevice,
}

impl ManagementInterface {
    pub fn new(device: SharedDevice) -> Self {
        Self { device }
    }

    /// Current side as `'l'` or `'r'`
    pub async fn get_side(&self) -> char {
        self.device.lock().await.state().side.as_char()
    }

    /// Select the side from the leading character of `input`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSide` without touching the device unless the input
    /// starts with `'l'` or `'r'`.
    pub async fn set_side(&self, input: &str) -> Result<()> {
        let side = Side::from_leading_char(input)?;
        let mut device = self.device.lock().await;
        device.set_side(side)?;
        info!("joystick side set to {}", side.name());
        Ok(())
    }

    /// Publish literal values parsed from `input`, skipping calibration and
    /// normalization
    ///
    /// # Errors
    ///
    /// Returns `MalformedInjection` if `input` does not hold three integers.
    pub async fn inject_event(&self, input: &str) -> Result<()> {
        let (x, y, btn) = parse_injection(input)?;
        self.device.lock().await.inject(x, y, btn != 0)?;
        info!("Event Raised {} {} {}", x, y, btn);
        Ok(())
    }

    /// Re-arm center calibration on the next successful read
    pub async fn request_calibration(&self) {
        self.device.lock().await.request_calibration();
        info!("calibration requested");
    }

    pub async fn status(&self) -> DeviceStatus {
        self.device.lock().await.state().status()
    }

    /// Read an attribute, rendered as text
    pub async fn read(&self, attribute: Attribute) -> Result<String> {
        match attribute {
            Attribute::Side => Ok(format!("{}\n", self.get_side().await)),
            Attribute::Status => {
                let status = self.status().await;
                let json = serde_json::to_string_pretty(&status).map_err(std::io::Error::from)?;
                Ok(format!("{}\n", json))
            }
            Attribute::InjectEvent | Attribute::Calibrate => Err(denied(attribute)),
        }
    }

    /// Write an attribute, returning the number of bytes consumed
    ///
    /// A malformed injection is reported with a warning and still counts as
    /// consumed; a bad side is returned as an error.
    pub async fn write(&self, attribute: Attribute, input: &str) -> Result<usize> {
        match attribute {
            Attribute::Side => self.set_side(input).await?,
            Attribute::InjectEvent => match self.inject_event(input).await {
                Ok(()) => {}
                Err(e @ JoystickError::MalformedInjection(_)) => warn!("{}", e),
                Err(e) => return Err(e),
            },
            Attribute::Calibrate => self.request_calibration().await,
            Attribute::Status => return Err(denied(attribute)),
        }

        Ok(input.len())
    }
}

fn denied(attribute: Attribute) -> JoystickError {
    let access = match attribute.access() {
        Access::ReadOnly => "writable",
        Access::WriteOnly => "readable",
        Access::ReadWrite => "accessible",
    };
    JoystickError::AccessDenied {
        attribute: attribute.name(),
        access,
    }
}

/// One parsed management command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub device: String,
    pub attribute: Attribute,
    /// `Some` for a write, `None` for a read
    pub value: Option<String>,
}

impl FromStr for Request {
    type Err = JoystickError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (device, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| JoystickError::MissingAttribute(line.to_string()))?;

        let rest = rest.trim_start();
        let (attribute, value) = match rest.split_once(char::is_whitespace) {
            Some((attribute, value)) => (attribute, Some(value.trim_start().to_string())),
            None => (rest, None),
        };

        Ok(Self {
            device: device.to_string(),
            attribute: attribute.parse()?,
            value,
        })
    }
}
