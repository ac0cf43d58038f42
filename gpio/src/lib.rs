//! Pin- and bus-level collaborators for the LCD1602 driver, plus the HD44780 protocol core in [lcd].
//!
//! The traits here are the only way the display core touches hardware: single output/input lines,
//! N-bit data buses that can switch direction, and an I2C byte channel ([i2c::I2cBus]).
pub mod gpiod;
pub mod i2c;
pub mod lcd;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("I2C error: {0:?}")]
    I2c(embedded_hal::i2c::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the GPIO line at the given index.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Claims several GPIO lines at once, to be driven together as a data bus.
    ///
    /// Index `0` of `indices` becomes the least significant bit of the bus.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the active level of a GPIO line.
///
/// By default, the active level is high.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the physical level for a logical `value`.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

/// Specifies the bias of a GPIO line (pull-up/pull-down resistors).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

pub trait GpioPin: Debug {
    /// Sets the line to input, allowing reading its state.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>>;
    /// Sets the line to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Gets the active level of the line.
    fn active_level(&self) -> GpioActiveLevel {
        GpioActiveLevel::High
    }
    /// Sets the active level of the line.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend does not support active level.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Gets the bias of the line.
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias of the line.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioInput: Debug {
    /// Reads the state of the line.
    fn read(&self) -> GpioResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the line.
    fn write(&self, value: bool) -> GpioResult<()>;
}

/// A group of lines switched between input and output together, like the HD44780 data pins.
///
/// Only one direction can be held at a time; the returned handle borrows the bus.
pub trait GpioBus<const N: usize>: Debug {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    fn read(&self) -> GpioResult<[bool; N]>;
}

impl<const N: usize> dyn GpioBusInput<N> + '_ {
    /// Reads the bus as an unsigned value, LSb first (line `0` is bit `0`).
    pub fn read_bits(&self) -> GpioResult<u8> {
        let values = self.read()?;
        Ok(values
            .iter()
            .enumerate()
            .filter(|(_, high)| **high)
            .fold(0u8, |acc, (i, _)| acc | (1 << i)))
    }
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl<const N: usize> dyn GpioBusOutput<N> + '_ {
    /// Writes an unsigned value to the bus, LSb first (bit `0` goes to line `0`).
    ///
    /// Returns [GpioError::InvalidArgument] if the value does not fit in `N` bits.
    pub fn write_bits(&self, value: u8) -> GpioResult<()> {
        if N < 8 && value >> N != 0 {
            return Err(GpioError::InvalidArgument);
        }
        let mut values = [false; N];
        for (i, line) in values.iter_mut().enumerate() {
            *line = value & (1 << i) != 0;
        }
        self.write(&values)
    }
}
