//! # Joystick Module
//!
//! Calibration, normalization and event publishing for one analog joystick.
//!
//! This module handles:
//! - Per-device state (side, calibration center, range, failure count)
//! - Center-point calibration and piecewise-linear normalization
//! - Routing positions to the left or right axis pair
//! - Publishing through a uinput virtual device

pub mod calibration;
pub mod device;
pub mod publisher;
pub mod state;
pub mod uinput;
