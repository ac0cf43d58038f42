//! Test transport emulating an HD44780 in 2-line mode.

use crate::lcd::hd44780::driver::{HD44780Transport, TransportCapabilities};
use crate::lcd::hd44780::{
    BusWidth, Capability, Command, CursorDirection, EntryDirection, LcdError, LcdResult,
    ShiftTarget,
};
use std::time::Duration;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
    Sync(u8),
    Command(Command),
    Data(u8),
    Read(u8),
    Delay(Duration),
    Backlight(bool),
}

#[derive(Debug)]
pub struct MockTransport {
    pub capabilities: TransportCapabilities,
    pub events: Vec<Event>,
    pub ddram: [u8; 0x80],
    pub cgram: [u8; 0x40],
    pub address: u8,
    pub cgram_selected: bool,
    pub direction: EntryDirection,
    pub display_shift: i32,
    /// Data register returned by the next read. Only loaded on address sets, cursor shifts and
    /// reads, so the first read after a write returns stale data.
    pub output: u8,
    pub backlight: bool,
    /// Number of upcoming busy flag reads reporting busy.
    pub busy_reads: usize,
    pub stuck_busy: bool,
    pub busy_polls: usize,
}

impl MockTransport {
    /// A controller behind a transport with every capability, like an I2C backpack.
    pub fn new() -> Self {
        Self::with_capabilities(TransportCapabilities {
            supports_read: true,
            supports_backlight: true,
            bus_width: BusWidth::Four,
        })
    }

    /// A 4-bit GPIO wiring with R/W tied to ground and no backlight line.
    pub fn write_only() -> Self {
        Self::with_capabilities(TransportCapabilities {
            supports_read: false,
            supports_backlight: false,
            bus_width: BusWidth::Four,
        })
    }

    pub fn with_capabilities(capabilities: TransportCapabilities) -> Self {
        MockTransport {
            capabilities,
            events: Vec::new(),
            ddram: [b' '; 0x80],
            cgram: [0; 0x40],
            address: 0,
            cgram_selected: false,
            direction: EntryDirection::LeftToRight,
            display_shift: 0,
            output: 0,
            backlight: false,
            busy_reads: 0,
            stuck_busy: false,
            busy_polls: 0,
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Command(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    pub fn data(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Data(data) => Some(*data),
                _ => None,
            })
            .collect()
    }

    /// Gets the DDRAM addresses each data write landed on, in order.
    pub fn write_addresses(&self) -> Vec<u8> {
        let mut replay = MockTransport::new();
        let mut addresses = Vec::new();
        for event in &self.events {
            match event {
                Event::Command(command) => replay.execute(*command),
                Event::Data(data) => {
                    if !replay.cgram_selected {
                        addresses.push(replay.address);
                    }
                    replay.store(*data);
                }
                Event::Read(_) => replay.advance(),
                _ => {}
            }
        }
        addresses
    }

    /// Gets the first `len` characters of a DDRAM line.
    pub fn line(&self, line: u8, len: usize) -> Vec<u8> {
        let start = if line == 0 { 0x00 } else { 0x40 };
        self.ddram[start..start + len].to_vec()
    }

    pub fn glyph(&self, slot: usize) -> [u8; 8] {
        let mut glyph = [0; 8];
        glyph.copy_from_slice(&self.cgram[slot * 8..slot * 8 + 8]);
        glyph
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn advance(&mut self) {
        if self.cgram_selected {
            self.address = match self.direction {
                EntryDirection::LeftToRight => (self.address + 1) & 0x3F,
                EntryDirection::RightToLeft => self.address.wrapping_sub(1) & 0x3F,
            };
        } else {
            self.move_ddram(self.direction.into());
        }
    }

    fn move_ddram(&mut self, direction: CursorDirection) {
        self.address = match (direction, self.address) {
            (CursorDirection::Right, 0x27) => 0x40,
            (CursorDirection::Right, 0x67) => 0x00,
            (CursorDirection::Right, address) => address + 1,
            (CursorDirection::Left, 0x00) => 0x67,
            (CursorDirection::Left, 0x40) => 0x27,
            (CursorDirection::Left, address) => address - 1,
        };
    }

    fn latch(&mut self) {
        self.output = if self.cgram_selected {
            self.cgram[self.address as usize]
        } else {
            self.ddram[self.address as usize]
        };
    }

    fn store(&mut self, data: u8) {
        if self.cgram_selected {
            self.cgram[self.address as usize] = data;
        } else {
            self.ddram[self.address as usize] = data;
        }
        self.advance();
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::ClearDisplay => {
                self.ddram = [b' '; 0x80];
                self.address = 0;
                self.cgram_selected = false;
                self.direction = EntryDirection::LeftToRight;
                self.display_shift = 0;
            }
            Command::ReturnHome => {
                self.address = 0;
                self.cgram_selected = false;
                self.display_shift = 0;
            }
            Command::EntryModeSet { direction, .. } => self.direction = direction,
            Command::CursorDisplayShift { target, direction } => match target {
                ShiftTarget::Cursor => {
                    self.move_ddram(direction);
                    self.latch();
                }
                ShiftTarget::Display if direction == CursorDirection::Right => {
                    self.display_shift += 1
                }
                ShiftTarget::Display => self.display_shift -= 1,
            },
            Command::SetCgramAddress(address) => {
                self.cgram_selected = true;
                self.address = address;
                self.latch();
            }
            Command::SetDdramAddress(address) => {
                self.cgram_selected = false;
                self.address = address;
                self.latch();
            }
            _ => {}
        }
    }
}

impl HD44780Transport for MockTransport {
    fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    fn write(&mut self, register_select: bool, data: u8) -> LcdResult<()> {
        if register_select {
            self.events.push(Event::Data(data));
            self.store(data);
        } else {
            let command = Command::from_raw(data as u16)?;
            self.events.push(Event::Command(command));
            self.execute(command);
        }
        Ok(())
    }

    fn read(&mut self, register_select: bool) -> LcdResult<u8> {
        if !self.capabilities.supports_read {
            return Err(LcdError::CapabilityUnavailable {
                operation: "read",
                capability: Capability::Read,
            });
        }
        if register_select {
            let data = self.output;
            self.events.push(Event::Read(data));
            self.advance();
            self.latch();
            Ok(data)
        } else {
            self.busy_polls += 1;
            let busy = self.stuck_busy || self.busy_reads > 0;
            self.busy_reads = self.busy_reads.saturating_sub(1);
            let busy_flag = if busy { 0x80 } else { 0 };
            Ok(busy_flag | self.address)
        }
    }

    fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        if !self.capabilities.supports_backlight {
            return Err(LcdError::CapabilityUnavailable {
                operation: "set_backlight",
                capability: Capability::Backlight,
            });
        }
        self.backlight = on;
        self.events.push(Event::Backlight(on));
        Ok(())
    }

    fn write_sync(&mut self, data: u8) -> LcdResult<()> {
        self.events.push(Event::Sync(data));
        Ok(())
    }

    fn delay(&mut self, duration: Duration) {
        self.events.push(Event::Delay(duration));
    }
}
