//! Trait abstraction for bus transactions to enable testing

use async_trait::async_trait;
use rppal::i2c::I2c;
use std::io;

use crate::error::{JoystickError, Result};

/// Trait for register-bus I/O operations
#[async_trait]
pub trait BusIO: Send {
    /// Perform one read transaction, returning the number of bytes received
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Linux i2c-dev slave handle that implements BusIO
///
/// The transaction itself is blocking, so it runs on tokio's blocking pool.
pub struct I2cPort {
    i2c: Option<I2c>,
    bus: u8,
    address: u16,
}

impl std::fmt::Debug for I2cPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cPort")
            .field("bus", &self.bus)
            .field("address", &format_args!("0x{:02x}", self.address))
            .finish_non_exhaustive()
    }
}

impl I2cPort {
    /// Open `/dev/i2c-<bus>` and select the slave at `address`
    ///
    /// # Errors
    ///
    /// Returns `BusOpen` if the bus device cannot be opened or the address
    /// cannot be selected.
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let open_error = |e: rppal::i2c::Error| JoystickError::BusOpen {
            bus,
            address,
            reason: e.to_string(),
        };

        let mut i2c = I2c::with_bus(bus).map_err(open_error)?;
        i2c.set_slave_address(address).map_err(open_error)?;

        Ok(Self {
            i2c: Some(i2c),
            bus,
            address,
        })
    }
}

#[async_trait]
impl BusIO for I2cPort {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Handle is lost only if a previous blocking read panicked
        let mut i2c = self
            .i2c
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "i2c handle lost"))?;

        let mut scratch = vec![0u8; buf.len()];
        let (i2c, result) = tokio::task::spawn_blocking(move || {
            let result = i2c.read(&mut scratch).map(|n| (n, scratch));
            (i2c, result)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        self.i2c = Some(i2c);

        let (n, scratch) = result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let n = n.min(buf.len());
        buf[..n].copy_from_slice(&scratch[..n]);
        Ok(n)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock bus for testing
    ///
    /// Replays scripted responses in order. Once the script runs out every
    /// transaction fails with `TimedOut`.
    #[derive(Clone, Default)]
    pub struct MockBusPort {
        pub responses: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
        pub recv_count: Arc<Mutex<usize>>,
    }

    impl MockBusPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a well-formed payload carrying `x` and `y`
        pub fn push_sample(&self, x: u16, y: u16) {
            self.push_raw(payload(x, y));
        }

        pub fn push_raw(&self, data: Vec<u8>) {
            self.responses.lock().unwrap().push_back(Ok(data));
        }

        pub fn push_error(&self, kind: io::ErrorKind) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(io::Error::new(kind, "Mock recv error")));
        }

        pub fn get_recv_count(&self) -> usize {
            *self.recv_count.lock().unwrap()
        }
    }

    /// Encode a sample the way the sensor sends it: Y first, then X
    pub fn payload(x: u16, y: u16) -> Vec<u8> {
        let mut data = Vec::with_capacity(4);
        data.extend_from_slice(&y.to_be_bytes());
        data.extend_from_slice(&x.to_be_bytes());
        data
    }

    #[async_trait]
    impl BusIO for MockBusPort {
        async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            *self.recv_count.lock().unwrap() += 1;

            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "Mock script exhausted")),
            }
        }
    }
}
