//! # Joystick Service Module
//!
//! Owns every probed joystick and its poll task.
//!
//! The service is created by the binary before the first probe and shut down
//! after the last device is removed. Each device gets a child of the service's
//! cancellation token, so [`JoystickService::shutdown`] (or dropping the
//! service) stops every poll loop, while [`JoystickService::remove`] stops one.
//!
//! ## Teardown order
//!
//! 1. Cancel the device token (no new tick is started)
//! 2. Await the poll task (an in-flight tick completes)
//! 3. Drop the device, releasing the bus handle and the virtual device

use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::bus::bus_trait::I2cPort;
use crate::bus::{bus_label, BusReader};
use crate::config::DeviceConfig;
use crate::error::{JoystickError, Result};
use crate::joystick::device::{JoystickDevice, SharedDevice};
use crate::joystick::publisher::EventSink;
use crate::joystick::uinput::UinputSink;
use crate::management::{ManagementInterface, Request};
use crate::poll::{self, PollCycle};

/// A running device and the handles needed to stop it
#[derive(Debug)]
struct DeviceHandle {
    device: SharedDevice,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DeviceHandle {
    async fn stop(self, name: &str) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Poll task for {} ended abnormally: {}", name, e);
        }
        drop(self.device);
        info!("Removed joystick {}", name);
    }
}

/// Process-wide owner of joystick poll tasks
#[derive(Debug, Default)]
pub struct JoystickService {
    devices: HashMap<String, DeviceHandle>,
    shutdown: CancellationToken,
}

impl JoystickService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe a device on real hardware
    ///
    /// Opens the i2c bus (unless suppressed) and a uinput virtual device, then
    /// starts polling.
    ///
    /// # Errors
    ///
    /// Returns `BusOpen` or `Publisher` if either resource cannot be
    /// acquired; anything already acquired is released.
    pub fn probe_hardware(&mut self, config: &DeviceConfig) -> Result<()> {
        let label = bus_label(config.bus, config.address);
        let bus = if config.suppress_bus {
            info!("Bus traffic suppressed for {}", config.name);
            BusReader::suppressed(label)
        } else {
            BusReader::new(Box::new(I2cPort::open(config.bus, config.address)?), label)
        };

        self.probe(config, bus, Box::new(UinputSink::default()))
    }

    /// Register a device and start its poll task
    ///
    /// Must be called from within a tokio runtime. The first tick runs one
    /// poll interval after this returns.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDevice` if the name is taken, or the sink's error if
    /// the input capabilities cannot be applied. The device never starts in
    /// either case.
    pub fn probe(&mut self, config: &DeviceConfig, bus: BusReader, sink: Box<dyn EventSink>) -> Result<()> {
        if self.devices.contains_key(&config.name) {
            return Err(JoystickError::DuplicateDevice(config.name.clone()));
        }

        let device = JoystickDevice::new(config, sink)?.into_shared();
        let cancel = self.shutdown.child_token();

        info!(
            "Probed joystick {} on {} ({} side, {} Hz{})",
            config.name,
            bus.label(),
            config.side.name(),
            config.poll_rate,
            if config.calibrate { ", calibrating" } else { "" }
        );

        let cycle = PollCycle::new(bus, device.clone());
        let span = info_span!("joystick", device = %config.name);
        let task = tokio::spawn(poll::run(cycle, cancel.clone()).instrument(span));

        self.devices.insert(
            config.name.clone(),
            DeviceHandle {
                device,
                cancel,
                task,
            },
        );
        Ok(())
    }

    /// Management handle for a probed device
    pub fn management(&self, name: &str) -> Result<ManagementInterface> {
        self.devices
            .get(name)
            .map(|handle| ManagementInterface::new(handle.device.clone()))
            .ok_or_else(|| JoystickError::UnknownDevice(name.to_string()))
    }

    /// Execute one management request
    ///
    /// Reads return the attribute text; writes return an empty string.
    pub async fn dispatch(&self, request: &Request) -> Result<String> {
        let management = self.management(&request.device)?;
        match &request.value {
            None => management.read(request.attribute).await,
            Some(value) => {
                management.write(request.attribute, value).await?;
                Ok(String::new())
            }
        }
    }

    /// Stop and release one device
    pub async fn remove(&mut self, name: &str) -> Result<()> {
        let handle = self
            .devices
            .remove(name)
            .ok_or_else(|| JoystickError::UnknownDevice(name.to_string()))?;
        handle.stop(name).await;
        Ok(())
    }

    /// Stop and release every device
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        for (name, handle) in self.devices.drain() {
            handle.stop(&name).await;
        }
    }

    /// Names of probed devices, sorted
    pub fn device_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.devices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Drop for JoystickService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
