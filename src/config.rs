//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! The `[defaults]` table holds the module-wide joystick parameters. Each
//! `[[devices]]` entry describes one joystick on the bus and may override any
//! of those parameters for that device only.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{JoystickError, Result};
use crate::joystick::publisher::Side;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub devices: Vec<DeviceDescriptor>,
}

/// Module-wide joystick parameters
#[derive(Debug, Deserialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_poll_rate")]
    pub poll_rate: u32,

    #[serde(default = "default_joy_min")]
    pub joy_min: i32,

    #[serde(default = "default_joy_max")]
    pub joy_max: i32,

    #[serde(default = "default_joy_fuzz")]
    pub joy_fuzz: i32,

    /// Skip bus traffic entirely and report a zeroed sample
    #[serde(default)]
    pub suppress_bus: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the rolling log file, empty for stdout only
    #[serde(default)]
    pub log_dir: String,
}

/// Per-device descriptor
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceDescriptor {
    pub name: String,

    #[serde(default = "default_bus")]
    pub bus: u8,

    pub address: u16,

    #[serde(default)]
    pub side: Side,

    #[serde(default)]
    pub calibrate: bool,

    pub poll_rate: Option<u32>,
    pub joy_min: Option<i32>,
    pub joy_max: Option<i32>,
    pub joy_fuzz: Option<i32>,
}

/// Fully resolved parameters for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    pub bus: u8,
    pub address: u16,
    pub side: Side,
    pub calibrate: bool,
    pub poll_rate: u32,
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub suppress_bus: bool,
}

// Default value functions
fn default_poll_rate() -> u32 { 10 }
fn default_joy_min() -> i32 { 0x000 }
fn default_joy_max() -> i32 { 0xFFF }
fn default_joy_fuzz() -> i32 { 0x020 }

fn default_log_level() -> String { "info".to_string() }

fn default_bus() -> u8 { 1 }

/// Highest accepted poll rate (polls per second)
const MAX_POLL_RATE: u32 = 1000;

/// Valid 7-bit I2C slave addresses (reserved ranges excluded)
const MIN_ADDRESS: u16 = 0x03;
const MAX_ADDRESS: u16 = 0x77;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            poll_rate: default_poll_rate(),
            joy_min: default_joy_min(),
            joy_max: default_joy_max(),
            joy_fuzz: default_joy_fuzz(),
            suppress_bus: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl DeviceDescriptor {
    /// Creates a descriptor with no per-device overrides.
    pub fn new(name: impl Into<String>, bus: u8, address: u16) -> Self {
        Self {
            name: name.into(),
            bus,
            address,
            side: Side::default(),
            calibrate: false,
            poll_rate: None,
            joy_min: None,
            joy_max: None,
            joy_fuzz: None,
        }
    }
}

impl DeviceConfig {
    /// Resolves a descriptor over the module-wide defaults.
    ///
    /// Descriptor values win. The poll rate is resolved into this device's
    /// own config and never written back to the defaults.
    pub fn resolve(defaults: &DefaultsConfig, descriptor: &DeviceDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            bus: descriptor.bus,
            address: descriptor.address,
            side: descriptor.side,
            calibrate: descriptor.calibrate,
            poll_rate: descriptor.poll_rate.unwrap_or(defaults.poll_rate),
            min: descriptor.joy_min.unwrap_or(defaults.joy_min),
            max: descriptor.joy_max.unwrap_or(defaults.joy_max),
            fuzz: descriptor.joy_fuzz.unwrap_or(defaults.joy_fuzz),
            suppress_bus: defaults.suppress_bus,
        }
    }

    /// Interval between polls while the bus is healthy (1 / poll_rate).
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(1) / self.poll_rate.max(1)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(config_error("device name cannot be empty"));
        }

        if self.poll_rate == 0 || self.poll_rate > MAX_POLL_RATE {
            return Err(config_error(format!(
                "{}: poll_rate must be between 1 and {}",
                self.name, MAX_POLL_RATE
            )));
        }

        if self.min >= self.max {
            return Err(config_error(format!(
                "{}: joy_min must be less than joy_max",
                self.name
            )));
        }

        if self.fuzz < 0 {
            return Err(config_error(format!(
                "{}: joy_fuzz cannot be negative",
                self.name
            )));
        }

        if !(MIN_ADDRESS..=MAX_ADDRESS).contains(&self.address) {
            return Err(config_error(format!(
                "{}: address 0x{:02x} must be between 0x{:02x} and 0x{:02x}",
                self.name, self.address, MIN_ADDRESS, MAX_ADDRESS
            )));
        }

        Ok(())
    }
}

fn config_error(msg: impl std::fmt::Display) -> JoystickError {
    JoystickError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fpga_joystick::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved parameters for every configured device, in file order
    pub fn device_configs(&self) -> Vec<DeviceConfig> {
        self.devices
            .iter()
            .map(|descriptor| DeviceConfig::resolve(&self.defaults, descriptor))
            .collect()
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(config_error(format!(
                "logging level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self.devices.is_empty() {
            return Err(config_error("at least one [[devices]] entry is required"));
        }

        let mut names = HashSet::new();
        for device in self.device_configs() {
            device.validate()?;

            if !names.insert(device.name.clone()) {
                return Err(config_error(format!(
                    "duplicate device name: {}",
                    device.name
                )));
            }
        }

        Ok(())
    }
}
