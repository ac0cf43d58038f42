use crate::i2c::I2cBus;
use crate::lcd::hd44780::driver::{
    HD44780Transport, TransportCapabilities, DELAY_ADDRESS_SETUP, DELAY_ENABLE_CYCLE,
    DELAY_ENABLE_PULSE,
};
use crate::lcd::hd44780::{BusWidth, LcdError, LcdResult};
use log::{debug, trace};
use std::thread::sleep;

// PCF8574 port bits as wired on the common LCD1602 backpacks: P0-P3 drive the control lines and
// the backlight transistor, P4-P7 drive DB4-DB7.
const PIN_RS: u8 = 0b0000_0001;
const PIN_RW: u8 = 0b0000_0010;
const PIN_E: u8 = 0b0000_0100;
const PIN_BL: u8 = 0b0000_1000;
const DATA_MASK: u8 = 0b1111_0000;

/// Transport for an HD44780 behind a PCF8574 I2C expander.
///
/// The controller is always run in 4-bit mode. Each nibble is one expander byte, written three
/// times: with Enable low, high, and low again. Reads and backlight control are always available.
///
/// Without an explicit address the expander has to be the only device on the bus; it is located
/// by scanning when the display is initialized.
#[derive(Debug)]
pub struct I2cHD44780Transport<'a> {
    bus: &'a mut dyn I2cBus,
    address: Option<u8>,
    backlight: bool,
}

impl<'a> I2cHD44780Transport<'a> {
    pub fn new(bus: &'a mut dyn I2cBus, address: Option<u8>) -> Self {
        I2cHD44780Transport {
            bus,
            address,
            backlight: true,
        }
    }

    /// Gets the expander address, once known.
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    fn discover(&mut self) -> LcdResult<u8> {
        let devices = self.bus.scan();
        if devices.is_empty() {
            return Err(LcdError::DeviceNotFound);
        }
        let address = match self.address {
            Some(address) if devices.contains(&address) => address,
            Some(address) => return Err(LcdError::DeviceNotResponding(address)),
            None if devices.len() == 1 => devices[0],
            None => return Err(LcdError::AmbiguousDevice(devices)),
        };
        debug!("LCD backpack found at {:#04X}", address);
        self.address = Some(address);
        Ok(address)
    }

    fn control_bits(&self, register_select: bool, read: bool) -> u8 {
        let mut bits = 0;
        if self.backlight {
            bits |= PIN_BL;
        }
        if read {
            bits |= PIN_RW;
        }
        if register_select {
            bits |= PIN_RS;
        }
        bits
    }

    fn send(&mut self, payload: u8) -> LcdResult<()> {
        let address = self.address.ok_or(LcdError::DeviceNotFound)?;
        trace!("Expander <- {:08b}", payload);
        self.bus.write(address, &[payload])?;
        Ok(())
    }

    fn write_nibble(&mut self, register_select: bool, nibble: u8) -> LcdResult<()> {
        let payload = (nibble << 4) | self.control_bits(register_select, false);
        self.send(payload)?;
        sleep(DELAY_ADDRESS_SETUP);
        self.send(payload | PIN_E)?;
        sleep(DELAY_ENABLE_PULSE);
        self.send(payload)?;
        sleep(DELAY_ENABLE_CYCLE);
        Ok(())
    }

    fn read_nibble(&mut self, register_select: bool) -> LcdResult<u8> {
        let address = self.address.ok_or(LcdError::DeviceNotFound)?;
        let payload = self.control_bits(register_select, true);
        self.send(payload)?;
        sleep(DELAY_ADDRESS_SETUP);
        // P4-P7 are quasi-bidirectional: they have to be driven high for the controller to be
        // able to pull them low.
        self.send(payload | PIN_E | DATA_MASK)?;
        sleep(DELAY_ENABLE_PULSE);
        let mut buffer = [0u8; 1];
        self.bus.read(address, &mut buffer)?;
        self.send(payload)?;
        sleep(DELAY_ENABLE_CYCLE);
        Ok(buffer[0] >> 4)
    }
}

impl HD44780Transport for I2cHD44780Transport<'_> {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            supports_read: true,
            supports_backlight: true,
            bus_width: BusWidth::Four,
        }
    }

    fn write(&mut self, register_select: bool, data: u8) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, register_select);
        self.write_nibble(register_select, data >> 4)?;
        self.write_nibble(register_select, data & 0x0F)
    }

    fn read(&mut self, register_select: bool) -> LcdResult<u8> {
        let high_nibble = self.read_nibble(register_select)?;
        let low_nibble = self.read_nibble(register_select)?;
        let data = (high_nibble << 4) | low_nibble;
        trace!("Read data: {:08b}, RS: {}", data, register_select);
        Ok(data)
    }

    /// Rewrites the expander port with only the backlight bit changed. Enable stays low, so the
    /// controller ignores it.
    fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        let payload = if on { PIN_BL } else { 0 };
        self.send(payload)?;
        self.backlight = on;
        Ok(())
    }

    fn write_sync(&mut self, data: u8) -> LcdResult<()> {
        self.write_nibble(false, data >> 4)
    }

    fn prepare(&mut self) -> LcdResult<()> {
        self.discover().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GpioError, GpioResult};
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct FakeI2c {
        present: Vec<u8>,
        written: Vec<(u8, u8)>,
        responses: VecDeque<u8>,
    }

    impl I2cBus for FakeI2c {
        fn write(&mut self, address: u8, bytes: &[u8]) -> GpioResult<()> {
            self.written.extend(bytes.iter().map(|&b| (address, b)));
            Ok(())
        }

        fn read(&mut self, address: u8, buffer: &mut [u8]) -> GpioResult<()> {
            if !self.present.contains(&address) {
                return Err(GpioError::Other("nack".into()));
            }
            buffer[0] = self.responses.pop_front().unwrap_or(0xFF);
            Ok(())
        }

        fn scan(&mut self) -> Vec<u8> {
            self.present.clone()
        }
    }

    fn payloads(bus: &FakeI2c) -> Vec<u8> {
        bus.written.iter().map(|&(_, b)| b).collect()
    }

    #[test]
    fn write_strobes_each_nibble_with_backlight_on() {
        let mut bus = FakeI2c {
            present: vec![0x27],
            ..Default::default()
        };
        {
            let mut transport = I2cHD44780Transport::new(&mut bus, Some(0x27));
            transport.write(true, 0x41).unwrap();
        }
        assert_eq!(payloads(&bus), vec![0x49, 0x4D, 0x49, 0x19, 0x1D, 0x19]);
        assert!(bus.written.iter().all(|&(address, _)| address == 0x27));
    }

    #[test]
    fn read_raises_data_lines_while_enable_is_high() {
        let mut bus = FakeI2c {
            present: vec![0x27],
            responses: VecDeque::from([0x8F, 0x2F]),
            ..Default::default()
        };
        let data = {
            let mut transport = I2cHD44780Transport::new(&mut bus, Some(0x27));
            transport.read(false).unwrap()
        };
        assert_eq!(data, 0x82);
        assert_eq!(payloads(&bus), vec![0x0A, 0xFE, 0x0A, 0x0A, 0xFE, 0x0A]);
    }

    #[test]
    fn backlight_change_does_not_strobe_enable() {
        let mut bus = FakeI2c {
            present: vec![0x3F],
            ..Default::default()
        };
        {
            let mut transport = I2cHD44780Transport::new(&mut bus, Some(0x3F));
            transport.set_backlight(false).unwrap();
            transport.write(false, 0x01).unwrap();
        }
        let payloads = payloads(&bus);
        assert_eq!(payloads[0], 0x00);
        assert!(payloads[1..].iter().all(|b| b & PIN_BL == 0));
    }

    #[test]
    fn failed_backlight_change_keeps_the_old_state() {
        let mut bus = FakeI2c {
            present: vec![0x27],
            ..Default::default()
        };
        let mut transport = I2cHD44780Transport::new(&mut bus, None);
        assert_eq!(transport.set_backlight(false), Err(LcdError::DeviceNotFound));
        assert!(transport.backlight);

        transport.prepare().unwrap();
        transport.write(true, 0x41).unwrap();
        drop(transport);
        assert!(payloads(&bus).iter().all(|b| b & PIN_BL != 0));
    }

    #[test]
    fn single_device_is_discovered() {
        let mut bus = FakeI2c {
            present: vec![0x3F],
            ..Default::default()
        };
        let mut transport = I2cHD44780Transport::new(&mut bus, None);
        transport.prepare().unwrap();
        assert_eq!(transport.address(), Some(0x3F));
    }

    #[test]
    fn discovery_failures_are_reported() {
        let mut empty = FakeI2c::default();
        assert_eq!(
            I2cHD44780Transport::new(&mut empty, None).prepare(),
            Err(LcdError::DeviceNotFound)
        );

        let mut crowded = FakeI2c {
            present: vec![0x27, 0x50],
            ..Default::default()
        };
        assert_eq!(
            I2cHD44780Transport::new(&mut crowded, None).prepare(),
            Err(LcdError::AmbiguousDevice(vec![0x27, 0x50]))
        );
        assert_eq!(
            I2cHD44780Transport::new(&mut crowded, Some(0x3F)).prepare(),
            Err(LcdError::DeviceNotResponding(0x3F))
        );
    }

    #[test]
    fn nothing_is_sent_before_the_device_is_known() {
        let mut bus = FakeI2c {
            present: vec![0x27],
            ..Default::default()
        };
        {
            let mut transport = I2cHD44780Transport::new(&mut bus, None);
            assert_eq!(transport.write(false, 0x01), Err(LcdError::DeviceNotFound));
        }
        assert!(bus.written.is_empty());
    }
}
