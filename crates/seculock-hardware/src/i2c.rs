//! I2C through the Linux i2c-dev interface (`/dev/i2c-N`).
//!
//! Each target address gets its own file handle bound with `I2C_SLAVE`.
//! Handles are opened on the first write to an address and kept for the
//! life of the bus.

use crate::error::{HardwareError, Result};
use crate::traits::I2cBus;
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Character device for bus `bus`.
pub fn bus_path(bus: u8) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{bus}"))
}

/// I2C bus backed by an i2c-dev character device.
pub struct I2cDevBus {
    path: PathBuf,
    devices: HashMap<u8, LinuxI2CDevice>,
}

impl I2cDevBus {
    /// Bus number `bus`. Nothing is opened until the first write.
    pub fn new(bus: u8) -> Self {
        Self::with_path(bus_path(bus))
    }

    /// Use the character device at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            devices: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn device(&mut self, address: u8) -> Result<&mut LinuxI2CDevice> {
        if !self.devices.contains_key(&address) {
            let device = LinuxI2CDevice::new(&self.path, u16::from(address)).map_err(|e| {
                HardwareError::unavailable(format!(
                    "{} address {address:#04x}: {e}",
                    self.path.display()
                ))
            })?;
            debug!(path = %self.path.display(), address, "I2C device opened");
            self.devices.insert(address, device);
        }
        self.devices
            .get_mut(&address)
            .ok_or_else(|| HardwareError::unavailable(format!("address {address:#04x}")))
    }
}

impl fmt::Debug for I2cDevBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut open: Vec<_> = self.devices.keys().copied().collect();
        open.sort_unstable();
        f.debug_struct("I2cDevBus")
            .field("path", &self.path)
            .field("open", &open)
            .finish()
    }
}

impl I2cBus for I2cDevBus {
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<()> {
        self.device(address)?
            .smbus_write_byte(byte)
            .map_err(|e| HardwareError::bus(format!("write to {address:#04x}: {e}")))
    }
}
