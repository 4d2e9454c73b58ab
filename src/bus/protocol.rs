//! # Joystick Payload Decoder
//!
//! The sensor answers every read with a fixed 4-byte payload:
//!
//! | Bytes | Field | Encoding |
//! |-------|-------|----------|
//! | 0..2  | Y     | big-endian u16, low 12 bits used |
//! | 2..4  | X     | big-endian u16, low 12 bits used |
//!
//! There is no write phase and no button bit; the button is always reported
//! released.

use bytes::Buf;

use crate::error::{JoystickError, Result};

/// Bytes per bus transaction
pub const PAYLOAD_LEN: usize = 4;

/// Mask applied to each 16-bit field (12-bit ADC)
pub const AXIS_MASK: u16 = 0x0FFF;

/// One raw reading from the sensor, before calibration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub x: i32,
    pub y: i32,
    pub button: bool,
}

/// Decode a sensor payload
///
/// # Errors
///
/// Returns `ShortRead` if fewer than [`PAYLOAD_LEN`] bytes are supplied.
///
/// # Examples
///
/// ```
/// use fpga_joystick::bus::protocol::decode_sample;
///
/// let sample = decode_sample(&[0x0A, 0xBC, 0xF1, 0x23])?;
/// assert_eq!(sample.y, 0xABC);
/// assert_eq!(sample.x, 0x123);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode_sample(payload: &[u8]) -> Result<RawSample> {
    if payload.len() < PAYLOAD_LEN {
        return Err(JoystickError::ShortRead {
            expected: PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let mut buf = &payload[..PAYLOAD_LEN];
    let y = buf.get_u16() & AXIS_MASK;
    let x = buf.get_u16() & AXIS_MASK;

    Ok(RawSample {
        x: i32::from(x),
        y: i32::from(y),
        button: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_y_before_x() {
        let sample = decode_sample(&[0x01, 0x00, 0x02, 0x00]).unwrap();
        assert_eq!(sample.y, 0x100);
        assert_eq!(sample.x, 0x200);
        assert!(!sample.button);
    }

    #[test]
    fn test_decode_masks_to_12_bits() {
        let sample = decode_sample(&[0xFF, 0xFF, 0xF0, 0x01]).unwrap();
        assert_eq!(sample.y, 0xFFF);
        assert_eq!(sample.x, 0x001);
    }

    #[test]
    fn test_decode_extremes() {
        let zero = decode_sample(&[0, 0, 0, 0]).unwrap();
        assert_eq!((zero.x, zero.y), (0, 0));

        let full = decode_sample(&[0x0F, 0xFF, 0x0F, 0xFF]).unwrap();
        assert_eq!((full.x, full.y), (4095, 4095));
    }

    #[test]
    fn test_decode_short_payload() {
        let err = decode_sample(&[0x01, 0x02, 0x03]).unwrap_err();
        match err {
            JoystickError::ShortRead { expected, actual } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected ShortRead, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(decode_sample(&[]).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let sample = decode_sample(&[0x00, 0x10, 0x00, 0x20, 0xAA]).unwrap();
        assert_eq!((sample.x, sample.y), (0x20, 0x10));
    }
}
