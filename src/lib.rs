//! # FPGA Joystick Library
//!
//! Poll two-axis analog joysticks attached over I2C and publish them as a
//! Linux input device.
//!
//! Each probed joystick is read at a fixed rate, optionally calibrated to its
//! rest position, normalized into the configured range and reported as the
//! left or right stick of a gamepad. Repeated bus failures slow polling down
//! until the device answers again.

pub mod bus;
pub mod config;
pub mod error;
pub mod joystick;
pub mod management;
pub mod poll;
pub mod service;
