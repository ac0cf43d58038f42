use crate::GpioError;
use crate::lcd::hd44780::Command;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

/// A transport feature that not every wiring provides.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// Reading from the controller. Needs the R/W line.
    Read,
    /// Switching the backlight. Needs a backlight line or an I2C backpack.
    Backlight,
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Read => write!(f, "read (R/W line)"),
            Capability::Backlight => write!(f, "backlight control"),
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("{operation} requires {capability}, which this transport does not provide")]
    CapabilityUnavailable {
        operation: &'static str,
        capability: Capability,
    },
    #[error("position (column {column}, line {line}) is outside the 40x2 DDRAM")]
    InvalidPosition { column: u8, line: u8 },
    #[error("character {0:?} has no mapping and no native code")]
    UnresolvableCharacter(char),
    #[error("controller still busy {waited:?} after {command}, check wiring and power")]
    HardwareTimeout { command: Command, waited: Duration },
    #[error("glyph slot {0} is outside 0-7")]
    InvalidSlot(u8),
    #[error("glyph row {row} has value {value:#07b}, wider than 5 bits")]
    InvalidBitmapRow { row: usize, value: u8 },
    #[error("operand of {0:?} does not fit the instruction")]
    InvalidOperand(Command),
    #[error("{0:#012b} is not a valid 10-bit HD44780 command")]
    InvalidRawCommand(u16),
    #[error("no device responds on the I2C bus, check the wiring")]
    DeviceNotFound,
    #[error("several devices respond on the I2C bus ({0:02X?}), an address must be given")]
    AmbiguousDevice(Vec<u8>),
    #[error("no device responds at I2C address {0:#04X}")]
    DeviceNotResponding(u8),
    #[error(transparent)]
    Gpio(#[from] GpioError),
}

pub type LcdResult<T> = Result<T, LcdError>;
