//! I2C byte transfer, the collaborator behind the PCF8574-based LCD backpacks.
use crate::{GpioError, GpioResult};
use embedded_hal::i2c::{Error as _, I2c};
use linux_embedded_hal::I2cdev;
use log::trace;
use std::fmt::{Debug, Formatter};
use std::ops::RangeInclusive;

/// The 7-bit addresses that are not reserved by the I2C specification.
pub const PROBE_RANGE: RangeInclusive<u8> = 0x08..=0x77;

/// Raw byte-level access to an I2C bus. Every call is a complete transaction with a device.
pub trait I2cBus: Debug {
    /// Writes `bytes` to the device at `address`.
    fn write(&mut self, address: u8, bytes: &[u8]) -> GpioResult<()>;

    /// Fills `buffer` with bytes read from the device at `address`.
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> GpioResult<()>;

    /// Checks whether a device acknowledges its address by reading a single byte from it.
    fn probe(&mut self, address: u8) -> bool {
        let mut buffer = [0u8; 1];
        self.read(address, &mut buffer).is_ok()
    }

    /// Lists the addresses of every device responding on the bus.
    fn scan(&mut self) -> Vec<u8> {
        let found: Vec<u8> = PROBE_RANGE.filter(|&address| self.probe(address)).collect();
        trace!("I2C scan found {:02X?}", found);
        found
    }
}

/// An [I2cBus] backed by a Linux `/dev/i2c-N` adapter.
pub struct LinuxI2cBus {
    bus_id: u8,
    device: I2cdev,
}

impl LinuxI2cBus {
    /// Opens `/dev/i2c-{bus_id}`.
    ///
    /// The clock and data lines are the ones the kernel device tree assigns to that adapter.
    pub fn open(bus_id: u8) -> GpioResult<Self> {
        let path = format!("/dev/i2c-{}", bus_id);
        let device = I2cdev::new(&path).map_err(|e| GpioError::Other(format!("{}: {}", path, e)))?;
        Ok(LinuxI2cBus { bus_id, device })
    }
}

impl Debug for LinuxI2cBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinuxI2cBus(/dev/i2c-{})", self.bus_id)
    }
}

impl I2cBus for LinuxI2cBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> GpioResult<()> {
        self.device
            .write(address, bytes)
            .map_err(|e| GpioError::I2c(e.kind()))
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> GpioResult<()> {
        self.device
            .read(address, buffer)
            .map_err(|e| GpioError::I2c(e.kind()))
    }
}
