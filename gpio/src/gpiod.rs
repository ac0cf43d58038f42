//! GPIO backend on top of the Linux GPIO character device (`/dev/gpiochipN`), using the gpiod library.
//!
//! Lines are requested from the kernel every time a pin or bus switches direction, which is what the
//! HD44780 data bus needs when alternating between writes and busy-flag reads.
use crate::{
    GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError,
    GpioInput, GpioOutput, GpioPin, GpioResult,
};
use bitvec::vec::BitVec;
use log::trace;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

const CONSUMER: &str = env!("CARGO_PKG_NAME");

/// GPIO driver owning one gpiochip and bookkeeping which of its lines are claimed.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_pins: BitVec::repeat(false, n),
        }
    }

    /// Opens the chip at `path`, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path.as_ref())?))
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        let n = self.count()?;
        if indices.iter().any(|&index| index >= n) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }
        for &index in indices {
            self.used_pins.set_aliased(index, true);
        }
        trace!("Claimed lines {:?} on {:?}", indices, self);
        Ok(())
    }

    fn release(&self, indices: &[usize]) {
        for &index in indices {
            self.used_pins.set_aliased(index, false);
        }
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(&[index])?;
        Ok(Box::new(GpiodLines {
            driver: self,
            indices: [index],
            config: LineConfig::default(),
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;
        Ok(Box::new(GpiodLines {
            driver: self,
            indices,
            config: LineConfig::default(),
        }))
    }
}

impl From<GpioActiveLevel> for gpiod::Active {
    fn from(level: GpioActiveLevel) -> Self {
        match level {
            GpioActiveLevel::High => gpiod::Active::High,
            GpioActiveLevel::Low => gpiod::Active::Low,
        }
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct LineConfig {
    active_level: GpioActiveLevel,
    bias: GpioBias,
}

/// One or more claimed lines. A single pin is simply `GpiodLines<1>`.
struct GpiodLines<'a, const N: usize> {
    driver: &'a GpiodDriver,
    indices: [usize; N],
    config: LineConfig,
}

impl<const N: usize> GpiodLines<'_, N> {
    fn offsets(&self) -> Vec<u32> {
        self.indices.iter().map(|&index| index as u32).collect()
    }

    fn request_input(&self) -> GpioResult<gpiod::Lines<gpiod::Input>> {
        Ok(self.driver.chip.request_lines(
            gpiod::Options::input(self.offsets())
                .consumer(CONSUMER)
                .active(self.config.active_level.into())
                .bias(self.config.bias.into()),
        )?)
    }

    fn request_output(&self) -> GpioResult<gpiod::Lines<gpiod::Output>> {
        Ok(self.driver.chip.request_lines(
            gpiod::Options::output(self.offsets())
                .consumer(CONSUMER)
                .active(self.config.active_level.into())
                .bias(self.config.bias.into()),
        )?)
    }
}

impl<const N: usize> Debug for GpiodLines<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.indices)
    }
}

impl<const N: usize> Drop for GpiodLines<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.indices);
    }
}

impl GpioPin for GpiodLines<'_, 1> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        let line = self.request_input()?;
        Ok(Box::new(GpiodHandle { owner: &*self, line }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let line = self.request_output()?;
        Ok(Box::new(GpiodHandle { owner: &*self, line }))
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.config.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.config.active_level = level;
        Ok(())
    }

    fn bias(&self) -> GpioBias {
        self.config.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.config.bias = bias;
        Ok(())
    }
}

impl<const N: usize> GpioBus<N> for GpiodLines<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        let line = self.request_input()?;
        Ok(Box::new(GpiodHandle { owner: &*self, line }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let line = self.request_output()?;
        Ok(Box::new(GpiodHandle { owner: &*self, line }))
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.config.active_level = level;
        Ok(())
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.config.bias = bias;
        Ok(())
    }
}

/// Requested lines in one direction. Dropping it hands the lines back to the kernel.
struct GpiodHandle<'a, const N: usize, D> {
    owner: &'a GpiodLines<'a, N>,
    line: gpiod::Lines<D>,
}

impl<const N: usize, D> Debug for GpiodHandle<'_, N, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[requested]", self.owner)
    }
}

impl GpioInput for GpiodHandle<'_, 1, gpiod::Input> {
    fn read(&self) -> GpioResult<bool> {
        let values = self.line.get_values([false])?;
        Ok(values[0])
    }
}

impl GpioOutput for GpiodHandle<'_, 1, gpiod::Output> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodHandle<'_, N, gpiod::Input> {
    fn read(&self) -> GpioResult<[bool; N]> {
        Ok(self.line.get_values([false; N])?)
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodHandle<'_, N, gpiod::Output> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.line.set_values(*values)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_a_missing_chip_fails() {
        assert!(GpiodDriver::open("/dev/gpiochip-missing").is_err());
        assert!(GpiodDriver::open(String::from("/dev/gpiochip-missing")).is_err());
    }
}
