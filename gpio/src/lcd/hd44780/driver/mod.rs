//! HD44780 transports.
//!
//! A transport moves single bytes between the host and the controller and knows nothing about
//! the instruction set. Three are provided:
//!
//! - [GpioHD44780Transport] with a 4-bit data bus (two enable pulses per byte, high nibble first),
//! - [GpioHD44780Transport] with an 8-bit data bus (one enable pulse per byte),
//! - [I2cHD44780Transport] for PCF8574 backpacks, which wire the controller in 4-bit mode.
//!
//! What a transport can do beyond writing is described by its [TransportCapabilities]. Calls needing
//! a missing capability fail with [LcdError::CapabilityUnavailable] instead of doing nothing.

mod gpio;
mod i2c;

use crate::lcd::hd44780::{BusWidth, Capability, LcdError, LcdResult};
pub use gpio::*;
pub use i2c::*;
use log::trace;
use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// Address set-up time (tAS), minimum 60 ns.
pub const DELAY_ADDRESS_SETUP: Duration = Duration::from_micros(1);
/// Enable pulse width (PWEH), minimum 450 ns. Also covers the read data delay and write set-up time.
pub const DELAY_ENABLE_PULSE: Duration = Duration::from_micros(1);
/// Enable cycle time (tcycE), minimum 1 µs between rising edges of E.
pub const DELAY_ENABLE_CYCLE: Duration = Duration::from_micros(1);

/// Instruction used by the reset sequence: function set, 8-bit bus. Only its high nibble matters.
const SYNC_8BIT: u8 = 0b00110000;
/// Instruction switching a synchronised controller to the 4-bit bus. Only its high nibble matters.
const SYNC_4BIT: u8 = 0b00100000;

/// What a transport supports. Fixed when the transport is built.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransportCapabilities {
    pub supports_read: bool,
    pub supports_backlight: bool,
    pub bus_width: BusWidth,
}

impl TransportCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.supports_read,
            Capability::Backlight => self.supports_backlight,
        }
    }

    /// Fails with [LcdError::CapabilityUnavailable] if `capability` is missing.
    pub fn require(&self, operation: &'static str, capability: Capability) -> LcdResult<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(LcdError::CapabilityUnavailable {
                operation,
                capability,
            })
        }
    }
}

/// Byte-level access to an HD44780 controller.
///
/// Both [Self::write] and [Self::read] return only once the enable pulse timing has been met.
/// Waiting for the controller to *execute* what was sent is not the transport's job.
pub trait HD44780Transport: Debug {
    fn capabilities(&self) -> TransportCapabilities;

    /// Writes a byte with RS set to `register_select` (`false` for instructions, `true` for data).
    fn write(&mut self, register_select: bool, data: u8) -> LcdResult<()>;

    /// Reads a byte with RS set to `register_select`: the busy flag and address counter for
    /// `false`, RAM data for `true`.
    fn read(&mut self, _register_select: bool) -> LcdResult<u8> {
        Err(LcdError::CapabilityUnavailable {
            operation: "read",
            capability: Capability::Read,
        })
    }

    /// Drives the backlight line.
    fn set_backlight(&mut self, _on: bool) -> LcdResult<()> {
        Err(LcdError::CapabilityUnavailable {
            operation: "set_backlight",
            capability: Capability::Backlight,
        })
    }

    /// Writes a byte with a single enable pulse, RS = 0. On a 4-bit bus only the high nibble
    /// reaches the controller. Used while the controller's bus width is still unknown.
    fn write_sync(&mut self, data: u8) -> LcdResult<()>;

    /// Blocks the calling thread.
    fn delay(&mut self, duration: Duration) {
        sleep(duration);
    }

    /// Gets the transport ready to talk to the controller, e.g. by locating it on a shared bus.
    /// Called at the start of [Self::synchronize].
    fn prepare(&mut self) -> LcdResult<()> {
        Ok(())
    }

    /// Runs the reset-by-instruction sequence (datasheet figures 23 and 24), which brings the
    /// controller into a known bus width whatever state it powered up in.
    ///
    /// Afterwards the controller expects a full function set on the transport's bus width.
    fn synchronize(&mut self, power_on_delay: Duration) -> LcdResult<()> {
        self.prepare()?;
        trace!("Synchronizing controller over {:?}", self);
        self.delay(power_on_delay);
        for wait in [
            Duration::from_millis(5),
            Duration::from_millis(1),
            Duration::from_millis(1),
        ] {
            self.write_sync(SYNC_8BIT)?;
            self.delay(wait);
        }
        if self.capabilities().bus_width == BusWidth::Four {
            self.write_sync(SYNC_4BIT)?;
            self.delay(Duration::from_millis(1));
        }
        Ok(())
    }
}
