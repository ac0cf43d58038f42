use crate::lcd::hd44780::driver::{
    HD44780Transport, TransportCapabilities, DELAY_ADDRESS_SETUP, DELAY_ENABLE_CYCLE,
    DELAY_ENABLE_PULSE,
};
use crate::lcd::hd44780::{BusWidth, Capability, LcdError, LcdResult};
use crate::{GpioBus, GpioBusInput, GpioOutput, GpioResult};
use log::trace;
use std::thread::sleep;

#[derive(Debug)]
pub enum GpioHD44780Bus<'a> {
    Bus8Bit(&'a mut dyn GpioBus<8>),
    Bus4Bit(&'a mut dyn GpioBus<4>),
}

impl GpioHD44780Bus<'_> {
    pub fn width(&self) -> BusWidth {
        match self {
            GpioHD44780Bus::Bus8Bit(_) => BusWidth::Eight,
            GpioHD44780Bus::Bus4Bit(_) => BusWidth::Four,
        }
    }
}

/// Transport driving the controller's pins directly.
///
/// The data bus is LSb first: line `0` of a 4-bit bus is DB4, line `0` of an 8-bit bus is DB0.
/// Without an R/W line the display's R/W pin must be tied to GND, and the transport is write-only.
/// The optional backlight line is expected to switch the backlight on when high.
#[derive(Debug)]
pub struct GpioHD44780Transport<'a> {
    pin_rs: &'a dyn GpioOutput,
    pin_e: &'a dyn GpioOutput,
    pin_rw: Option<&'a dyn GpioOutput>,
    pin_bl: Option<&'a dyn GpioOutput>,
    data_bus: GpioHD44780Bus<'a>,
}

impl<'a> GpioHD44780Transport<'a> {
    /// Creates a transport using a 4-bit data bus wired to DB4–DB7.
    pub fn new_4bit(
        pin_rs: &'a dyn GpioOutput,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<4>,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_bl: Option<&'a dyn GpioOutput>,
    ) -> Self {
        GpioHD44780Transport {
            pin_rs,
            pin_e,
            pin_rw,
            pin_bl,
            data_bus: GpioHD44780Bus::Bus4Bit(data_bus),
        }
    }

    /// Creates a transport using an 8-bit data bus wired to DB0–DB7.
    pub fn new_8bit(
        pin_rs: &'a dyn GpioOutput,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<8>,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_bl: Option<&'a dyn GpioOutput>,
    ) -> Self {
        GpioHD44780Transport {
            pin_rs,
            pin_e,
            pin_rw,
            pin_bl,
            data_bus: GpioHD44780Bus::Bus8Bit(data_bus),
        }
    }

    fn pulse_e(pin: &dyn GpioOutput) -> GpioResult<()> {
        pin.write(true)?;
        sleep(DELAY_ENABLE_PULSE);
        pin.write(false)?;
        sleep(DELAY_ENABLE_CYCLE);
        Ok(())
    }

    /// Samples the bus while E is high, when the controller drives it.
    fn strobe_read<const N: usize>(
        pin: &dyn GpioOutput,
        input: &(dyn GpioBusInput<N> + '_),
    ) -> GpioResult<u8> {
        pin.write(true)?;
        sleep(DELAY_ENABLE_PULSE);
        let value = input.read_bits()?;
        pin.write(false)?;
        sleep(DELAY_ENABLE_CYCLE);
        Ok(value)
    }

    fn select(&self, register_select: bool, read: bool) -> GpioResult<()> {
        self.pin_rs.write(register_select)?;
        if let Some(rw) = self.pin_rw {
            rw.write(read)?;
        }
        sleep(DELAY_ADDRESS_SETUP);
        Ok(())
    }
}

impl HD44780Transport for GpioHD44780Transport<'_> {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            supports_read: self.pin_rw.is_some(),
            supports_backlight: self.pin_bl.is_some(),
            bus_width: self.data_bus.width(),
        }
    }

    fn write(&mut self, register_select: bool, data: u8) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, register_select);
        self.select(register_select, false)?;

        match &mut self.data_bus {
            GpioHD44780Bus::Bus8Bit(bus) => {
                let bus = bus.as_output()?;
                bus.write_bits(data)?;
                Self::pulse_e(self.pin_e)?;
            }
            GpioHD44780Bus::Bus4Bit(bus) => {
                let bus = bus.as_output()?;
                for nibble in [data >> 4, data & 0x0F] {
                    trace!("Writing nibble: {:04b}", nibble);
                    bus.write_bits(nibble)?;
                    Self::pulse_e(self.pin_e)?;
                }
            }
        }
        Ok(())
    }

    fn read(&mut self, register_select: bool) -> LcdResult<u8> {
        let Some(pin_rw) = self.pin_rw else {
            return Err(LcdError::CapabilityUnavailable {
                operation: "read",
                capability: Capability::Read,
            });
        };

        self.select(register_select, true)?;

        // The input handle has to be dropped before the bus is requested as output again.
        let data = match &mut self.data_bus {
            GpioHD44780Bus::Bus8Bit(bus) => {
                let input = bus.as_input()?;
                Self::strobe_read(self.pin_e, &*input)?
            }
            GpioHD44780Bus::Bus4Bit(bus) => {
                let input = bus.as_input()?;
                let high_nibble = Self::strobe_read(self.pin_e, &*input)?;
                let low_nibble = Self::strobe_read(self.pin_e, &*input)?;
                (high_nibble << 4) | low_nibble
            }
        };

        pin_rw.write(false)?;
        trace!("Read data: {:08b}, RS: {}", data, register_select);
        Ok(data)
    }

    fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        let Some(pin_bl) = self.pin_bl else {
            return Err(LcdError::CapabilityUnavailable {
                operation: "set_backlight",
                capability: Capability::Backlight,
            });
        };
        trace!("Backlight: {}", on);
        pin_bl.write(on)?;
        Ok(())
    }

    fn write_sync(&mut self, data: u8) -> LcdResult<()> {
        trace!("Sending sync: {:08b}", data);
        self.select(false, false)?;
        match &mut self.data_bus {
            GpioHD44780Bus::Bus8Bit(bus) => bus.as_output()?.write_bits(data)?,
            GpioHD44780Bus::Bus4Bit(bus) => bus.as_output()?.write_bits(data >> 4)?,
        }
        Self::pulse_e(self.pin_e)?;
        Ok(())
    }
}
