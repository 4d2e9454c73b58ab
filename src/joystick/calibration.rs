//! # Calibration Module
//!
//! Center-point calibration and piecewise-linear axis normalization.
//!
//! ## Calibration
//!
//! A joystick can rest slightly off center. When calibration is pending, the
//! first successful sample is taken as the rest position for both axes.
//!
//! ## Normalization
//!
//! Readings are rescaled with two linear segments so that the calibrated
//! center lands on the ideal midpoint `(min + max) / 2`:
//!
//! - above center: `(v - c) * ideal / (max - c) + ideal`
//! - at or below:  `v * (ideal - min) / (c - min)`
//!
//! All arithmetic is integer and truncates toward zero.
//!
//! ## Usage
//!
//! ```
//! use fpga_joystick::joystick::calibration::normalize_axis;
//!
//! // Stick resting at 1800 on a 0..4096 range
//! assert_eq!(normalize_axis(1800, 0, 1800, 4096), 2048);
//! assert_eq!(normalize_axis(0, 0, 1800, 4096), 0);
//! assert_eq!(normalize_axis(4096, 0, 1800, 4096), 4096);
//! ```

use crate::joystick::state::DeviceState;

/// Midpoint of `[min, max]`, truncated toward zero
///
/// Summed in `i64`, so any `i32` range is safe.
///
/// ```
/// use fpga_joystick::joystick::calibration::midpoint;
///
/// assert_eq!(midpoint(0, 4095), 2047);
/// assert_eq!(midpoint(1, i32::MAX), 1 << 30);
/// ```
#[must_use]
pub fn midpoint(min: i32, max: i32) -> i32 {
    ((i64::from(min) + i64::from(max)) / 2) as i32
}

/// Rescale `v` so the calibrated `center` maps to the midpoint of `[min, max]`.
///
/// If `center` sits on either end of the range the calibration is unusable
/// and `center` is returned unchanged for every input.
///
/// # Examples
///
/// ```
/// use fpga_joystick::joystick::calibration::normalize_axis;
///
/// // Out-of-range readings are clamped first
/// assert_eq!(normalize_axis(-50, 0, 2048, 4096), 0);
///
/// // Degenerate calibration
/// assert_eq!(normalize_axis(1234, 0, 0, 4095), 0);
/// ```
#[must_use]
pub fn normalize_axis(v: i32, min: i32, center: i32, max: i32) -> i32 {
    if center == min || center == max {
        return center;
    }

    let v = i64::from(v.clamp(min, max));
    let ideal = i64::from(midpoint(min, max));
    let (min, center, max) = (i64::from(min), i64::from(center), i64::from(max));

    let scaled = if v > center {
        (v - center) * ideal / (max - center) + ideal
    } else {
        v * (ideal - min) / (center - min)
    };

    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Capture `(raw_x, raw_y)` as the center point if calibration is pending.
///
/// Returns `true` if the center was updated. The captured point is clamped
/// into `[min, max]` and the pending flag is cleared.
pub fn maybe_calibrate(state: &mut DeviceState, raw_x: i32, raw_y: i32) -> bool {
    if !state.calibration_pending {
        return false;
    }

    state.center_x = raw_x.clamp(state.min, state.max);
    state.center_y = raw_y.clamp(state.min, state.max);
    state.calibration_pending = false;
    true
}
