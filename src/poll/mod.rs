//! # Poll Scheduler Module
//!
//! Drives the periodic read → calibrate → normalize → publish cycle of one
//! joystick.
//!
//! Each tick is scheduled only after the previous one has completed, with a
//! delay chosen by [`backoff::Backoff`]: the configured poll interval while
//! healthy, ten seconds after five consecutive bus failures. No failure stops
//! the loop; only cancellation does.
//!
//! ## Cancellation
//!
//! The delay between ticks is raced against a [`CancellationToken`] and the
//! token is checked again before every tick. A tick that has already started
//! runs to completion, so the owner can cancel and then await the task
//! before releasing the device.

pub mod backoff;

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::BusReader;
use crate::joystick::device::SharedDevice;

/// One device's poll cycle: its bus and the shared device it feeds
#[derive(Debug)]
pub struct PollCycle {
    bus: BusReader,
    device: SharedDevice,
}

impl PollCycle {
    pub fn new(bus: BusReader, device: SharedDevice) -> Self {
        Self { bus, device }
    }

    /// Run one tick and return the delay before the next one
    ///
    /// The bus is read without holding the device lock; the lock is taken
    /// for the rest of the tick.
    pub async fn tick(&mut self) -> Duration {
        let result = self.bus.read().await;

        let mut device = self.device.lock().await;
        match result {
            Ok(sample) => {
                if let Err(e) = device.on_sample(sample) {
                    device.on_publish_failure(&e);
                }
            }
            Err(e) => device.on_failure(&e),
        }

        device.state().backoff.next_interval()
    }

    /// Delay before the very first tick
    pub async fn initial_delay(&mut self) -> Duration {
        self.device.lock().await.state().backoff.normal_interval()
    }
}

/// Run the poll loop until `cancel` fires
pub async fn run(mut cycle: PollCycle, cancel: CancellationToken) {
    debug!("Poll loop started on {}", cycle.bus.label());
    let mut delay = cycle.initial_delay().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        if cancel.is_cancelled() {
            break;
        }

        delay = cycle.tick().await;
    }

    debug!("Poll loop stopped on {}", cycle.bus.label());
}
