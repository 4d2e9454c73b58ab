//! # Bus Communication Module
//!
//! Handles polling the joystick sensor over I2C.
//!
//! This module handles:
//! - Opening the i2c-dev node for the configured bus and slave address
//! - One fixed-size read transaction per poll
//! - Decoding the payload into a raw (x, y) sample
//! - Bus suppression for running without hardware
//!
//! Retry policy is not handled here; see [`crate::poll`].

pub mod bus_trait;
pub mod protocol;

use tracing::debug;

use crate::error::{JoystickError, Result};
use bus_trait::BusIO;
use protocol::{decode_sample, RawSample, PAYLOAD_LEN};

/// Joystick sensor reader
///
/// Wraps a [`BusIO`] handle and turns one transaction into a [`RawSample`].
pub struct BusReader {
    /// Bus handle, `None` when traffic is suppressed
    port: Option<Box<dyn BusIO>>,
    /// Human-readable location, e.g. `i2c-1@0x52`
    label: String,
}

impl std::fmt::Debug for BusReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusReader")
            .field("label", &self.label)
            .field("suppressed", &self.port.is_none())
            .finish_non_exhaustive()
    }
}

impl BusReader {
    /// Create a reader over an opened bus handle
    pub fn new(port: Box<dyn BusIO>, label: impl Into<String>) -> Self {
        Self {
            port: Some(port),
            label: label.into(),
        }
    }

    /// Create a reader that never touches the bus
    ///
    /// Every read succeeds with a zeroed sample.
    pub fn suppressed(label: impl Into<String>) -> Self {
        Self {
            port: None,
            label: label.into(),
        }
    }

    /// Bus location used in log messages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Perform exactly one bus transaction and decode it
    ///
    /// # Errors
    ///
    /// Returns `Bus` if the transaction fails and `ShortRead` if the device
    /// answers with fewer than 4 bytes. There is no internal retry.
    pub async fn read(&mut self) -> Result<RawSample> {
        let Some(port) = self.port.as_mut() else {
            debug!("suppressed i2c read to {}", self.label);
            return Ok(RawSample::default());
        };

        let mut buf = [0u8; PAYLOAD_LEN];
        let n = port
            .recv(&mut buf)
            .await
            .map_err(|e| JoystickError::Bus(format!("i2c recv failed for {}: {}", self.label, e)))?;

        if n != PAYLOAD_LEN {
            return Err(JoystickError::ShortRead {
                expected: PAYLOAD_LEN,
                actual: n,
            });
        }

        decode_sample(&buf)
    }
}

/// Format a bus location for logs
pub fn bus_label(bus: u8, address: u16) -> String {
    format!("i2c-{}@0x{:02x}", bus, address)
}
