//! # Error Types
//!
//! Custom error types for the joystick poller using `thiserror`.

use thiserror::Error;

/// Main error type for the joystick poller
#[derive(Debug, Error)]
pub enum JoystickError {
    /// Bus transaction failed
    #[error("Bus error: {0}")]
    Bus(String),

    /// Bus transaction returned fewer bytes than the payload needs
    #[error("Short bus read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Bus handle could not be acquired at startup
    #[error("Failed to open bus {bus} at address 0x{address:02x}: {reason}")]
    BusOpen { bus: u8, address: u16, reason: String },

    /// Input consumer rejected a configuration or an event
    #[error("Publisher error: {0}")]
    Publisher(String),

    /// Side selection other than 'l' or 'r'
    #[error("Invalid side {0:?}: expected 'l' or 'r'")]
    InvalidSide(String),

    /// Event injection without exactly three integers
    #[error("Bad format for event injection - 3 ints must be supplied: {0:?}")]
    MalformedInjection(String),

    /// Management attribute name not in the handler table
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Management request names a device but no attribute
    #[error("Missing attribute for device {0:?}")]
    MissingAttribute(String),

    /// Management attribute does not support the requested access
    #[error("Attribute {attribute} is not {access}")]
    AccessDenied {
        attribute: &'static str,
        access: &'static str,
    },

    /// No probed device with this name
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// A device with this name is already probed
    #[error("Device already probed: {0}")]
    DuplicateDevice(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the joystick poller
pub type Result<T> = std::result::Result<T, JoystickError>;
