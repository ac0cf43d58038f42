use crate::{GpioBus, GpioOutput};
use crate::i2c::I2cBus;
use crate::lcd::hd44780::charmap::{self, BLANK_GLYPH, SLOTS};
use crate::lcd::hd44780::ddram::CursorPosition;
use crate::lcd::hd44780::driver::{
    GpioHD44780Transport, HD44780Transport, I2cHD44780Transport, TransportCapabilities,
};
use crate::lcd::hd44780::timing::{CommandEncoder, TimingConfig};
use crate::lcd::hd44780::{
    Capability, CharacterMap, Command, CursorDirection, CursorType, DisplayState,
    EntryDirection, Glyph, LcdResult, ShiftTarget,
};
use log::{debug, trace};

/// Driver for a 16x2 character LCD with an HD44780 (or compatible) controller.
///
/// Positions are given as `(column, line)` and cover the whole DDRAM: 40 columns on each of the
/// 2 lines, the first 16 of which are visible unless the display is scrolled.
///
/// The driver keeps track of the cursor, so writing at the position the cursor is already at does
/// not send an extra set address instruction. Text never wraps from one line to the next: a write
/// reaching the end of the line stops there.
///
/// # Example
///
/// ```no_run
/// use lcd1602_gpio::i2c::LinuxI2cBus;
/// use lcd1602_gpio::lcd::hd44780::Lcd1602;
///
/// let mut bus = LinuxI2cBus::open(1)?;
/// let mut lcd = Lcd1602::begin_i2c(&mut bus, Some(0x27))?;
/// lcd.write_text(0, 0, "Hello, world!")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Lcd1602<T: HD44780Transport> {
    encoder: CommandEncoder<T>,
    state: DisplayState,
    cursor: CursorPosition,
    /// Whether DDRAM is selected and the address counter follows [Self::cursor].
    cursor_known: bool,
    /// Whether the next positioned access at [Self::cursor] can skip setting the address.
    cursor_synced: bool,
    charmap: CharacterMap,
    glyphs: [Glyph; SLOTS],
}

impl<'a> Lcd1602<GpioHD44780Transport<'a>> {
    /// Creates and initializes a display wired with a 4-bit data bus to DB4–DB7.
    ///
    /// Without `pin_rw`, reading is unavailable and the driver waits fixed delays instead of
    /// polling the busy flag. Without `pin_bl`, the backlight cannot be switched.
    pub fn begin_4bit(
        pin_rs: &'a dyn GpioOutput,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<4>,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_bl: Option<&'a dyn GpioOutput>,
    ) -> LcdResult<Self> {
        let transport = GpioHD44780Transport::new_4bit(pin_rs, pin_e, data_bus, pin_rw, pin_bl);
        Self::begin(transport)
    }

    /// Creates and initializes a display wired with an 8-bit data bus to DB0–DB7.
    pub fn begin_8bit(
        pin_rs: &'a dyn GpioOutput,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<8>,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_bl: Option<&'a dyn GpioOutput>,
    ) -> LcdResult<Self> {
        let transport = GpioHD44780Transport::new_8bit(pin_rs, pin_e, data_bus, pin_rw, pin_bl);
        Self::begin(transport)
    }
}

impl<'a> Lcd1602<I2cHD44780Transport<'a>> {
    /// Creates and initializes a display behind a PCF8574 backpack.
    ///
    /// Without an `address`, the backpack must be the only device on the bus.
    pub fn begin_i2c(bus: &'a mut dyn I2cBus, address: Option<u8>) -> LcdResult<Self> {
        Self::begin(I2cHD44780Transport::new(bus, address))
    }
}

impl<T: HD44780Transport> Lcd1602<T> {
    /// Creates a driver without touching the hardware. [Self::init] has to be called before use.
    pub fn new(transport: T, timing: TimingConfig) -> Self {
        Lcd1602 {
            encoder: CommandEncoder::new(transport, timing),
            state: DisplayState::default(),
            cursor: CursorPosition::HOME,
            cursor_known: false,
            cursor_synced: false,
            charmap: CharacterMap::new(),
            glyphs: [BLANK_GLYPH; SLOTS],
        }
    }

    fn begin(transport: T) -> LcdResult<Self> {
        let mut lcd = Self::new(transport, TimingConfig::default());
        lcd.init()?;
        Ok(lcd)
    }

    /// Resets the controller and brings it to the default state: two lines, 5x8 font, cleared,
    /// writing left to right without autoscroll, display on with no cursor, all custom glyphs
    /// blank and unbound, backlight on when it can be switched.
    pub fn init(&mut self) -> LcdResult<()> {
        let capabilities = self.capabilities();
        debug!("Initializing LCD1602 with {:?}", capabilities);
        self.charmap.clear();

        self.encoder.synchronize()?;
        self.issue(Command::FunctionSet {
            bus_width: capabilities.bus_width,
            two_lines: true,
            large_font: false,
        })?;
        self.issue(Command::ClearDisplay)?;
        self.issue(Command::EntryModeSet {
            direction: EntryDirection::LeftToRight,
            autoscroll: false,
        })?;
        self.issue(Command::DisplayControl {
            display_on: true,
            cursor: CursorType::None,
        })?;
        for slot in 0..SLOTS as u8 {
            self.write_glyph(slot, &BLANK_GLYPH)?;
        }
        self.issue(Command::ReturnHome)?;

        if capabilities.supports_backlight {
            self.set_backlight_on()?;
        }
        Ok(())
    }

    pub fn capabilities(&self) -> TransportCapabilities {
        self.encoder.capabilities()
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn character_map(&self) -> &CharacterMap {
        &self.charmap
    }

    pub fn timing(&self) -> &TimingConfig {
        self.encoder.timing()
    }

    pub fn transport(&self) -> &T {
        self.encoder.transport()
    }

    /// Blanks the display, moves the cursor home, undoes scrolling and resets the entry direction
    /// to left to right.
    pub fn clear(&mut self) -> LcdResult<()> {
        self.issue(Command::ClearDisplay)
    }

    /// Moves the cursor home and undoes scrolling, keeping the content.
    pub fn home(&mut self) -> LcdResult<()> {
        self.issue(Command::ReturnHome)
    }

    /// Gets the position the driver last moved the cursor to.
    pub fn get_cursor_position(&self) -> (u8, u8) {
        (self.cursor.column, self.cursor.line)
    }

    /// Reads the cursor position from the controller's address counter.
    ///
    /// Only meaningful while DDRAM is selected, i.e. not right after defining a glyph.
    pub fn read_cursor_position(&mut self) -> LcdResult<(u8, u8)> {
        self.capabilities()
            .require("read_cursor_position", Capability::Read)?;
        let status = self.issue_read(Command::ReadBusyAddress)?;
        let position = CursorPosition::from_address(status & 0b01111111)?;
        if self.cursor_known {
            self.set_tracked(Ok(position));
        }
        Ok((position.column, position.line))
    }

    pub fn set_cursor_position(&mut self, column: u8, line: u8) -> LcdResult<()> {
        let position = CursorPosition::new(column, line)?;
        self.issue(Command::SetDdramAddress(position.address()))
    }

    /// Moves the cursor one cell left. From column 0 it continues at column 39 of the other line.
    pub fn move_cursor_left(&mut self) -> LcdResult<()> {
        self.issue(Command::CursorDisplayShift {
            target: ShiftTarget::Cursor,
            direction: CursorDirection::Left,
        })
    }

    /// Moves the cursor one cell right. From column 39 it continues at column 0 of the other line.
    pub fn move_cursor_right(&mut self) -> LcdResult<()> {
        self.issue(Command::CursorDisplayShift {
            target: ShiftTarget::Cursor,
            direction: CursorDirection::Right,
        })
    }

    /// Writes one character code at a position. Codes 0–7 show the custom glyphs.
    pub fn write_code(&mut self, column: u8, line: u8, code: u8) -> LcdResult<()> {
        let position = CursorPosition::new(column, line)?;
        self.seek(position)?;
        self.issue(Command::WriteData(code))
    }

    /// Writes character codes starting at a position, in the current entry direction.
    ///
    /// Codes that would go past the end of the line (column 39 writing left to right, column 0
    /// writing right to left) are dropped.
    pub fn write_codes(&mut self, column: u8, line: u8, codes: &[u8]) -> LcdResult<()> {
        let position = CursorPosition::new(column, line)?;
        let room = position.room(self.state.entry_direction);
        if codes.len() > room {
            debug!(
                "Clipping write at ({}, {}) to {} of {} codes",
                column,
                line,
                room,
                codes.len()
            );
        }
        self.seek(position)?;
        for &code in codes.iter().take(room) {
            self.issue(Command::WriteData(code))?;
        }
        Ok(())
    }

    /// Writes text starting at a position, like [Self::write_codes].
    ///
    /// Each character is sent as its bound glyph slot if it has one, or as its code in the
    /// controller's character set otherwise. Nothing is written if any character has neither.
    pub fn write_text(&mut self, column: u8, line: u8, text: &str) -> LcdResult<()> {
        CursorPosition::new(column, line)?;
        let codes = text
            .chars()
            .map(|c| self.charmap.resolve(c))
            .collect::<LcdResult<Vec<u8>>>()?;
        trace!("Resolved {:?} to {:02X?}", text, codes);
        self.write_codes(column, line, &codes)
    }

    /// Reads the character code at a position. Needs a transport able to read.
    ///
    /// The address is always set, even at the tracked cursor: after a data write the controller's
    /// output register only holds valid data once the address was set or the cursor shifted.
    pub fn read_code(&mut self, column: u8, line: u8) -> LcdResult<u8> {
        self.capabilities().require("read_code", Capability::Read)?;
        let position = CursorPosition::new(column, line)?;
        self.issue(Command::SetDdramAddress(position.address()))?;
        self.issue_read(Command::ReadData)
    }

    /// Defines the glyph shown for code `slot` (0–7).
    ///
    /// Each row holds 5 pixels in its lowest bits, bit 4 being the leftmost. The glyph is kept,
    /// so the slot can later be bound with [Self::map_character].
    pub fn create_character(&mut self, slot: u8, bitmap: &Glyph) -> LcdResult<()> {
        let index = charmap::validate_slot(slot)?;
        charmap::validate_glyph(bitmap)?;
        self.write_glyph(slot, bitmap)?;
        self.glyphs[index] = *bitmap;
        Ok(())
    }

    /// Binds `character` to the glyph in `slot`, so that [Self::write_text] shows it.
    ///
    /// The slot's glyph, as last given to [Self::create_character], is written to the controller
    /// again first. A character previously bound to the slot loses its binding.
    pub fn map_character(&mut self, character: char, slot: u8) -> LcdResult<()> {
        let index = charmap::validate_slot(slot)?;
        let glyph = self.glyphs[index];
        self.write_glyph(slot, &glyph)?;
        self.charmap.bind(character, slot)?;
        Ok(())
    }

    /// Removes the binding of `character`, returning the slot it was bound to. The glyph itself
    /// stays in the controller.
    pub fn unmap_character(&mut self, character: char) -> Option<u8> {
        self.charmap.unbind(character)
    }

    /// Scrolls both lines one cell left. The cursor keeps its DDRAM position.
    pub fn scroll_display_left(&mut self) -> LcdResult<()> {
        // Scrolling the viewport left moves the content right.
        self.issue(Command::CursorDisplayShift {
            target: ShiftTarget::Display,
            direction: CursorDirection::Right,
        })
    }

    /// Scrolls both lines one cell right. The cursor keeps its DDRAM position.
    pub fn scroll_display_right(&mut self) -> LcdResult<()> {
        self.issue(Command::CursorDisplayShift {
            target: ShiftTarget::Display,
            direction: CursorDirection::Left,
        })
    }

    /// Makes the display shift with every write, so the cursor stays in place on screen.
    pub fn set_autoscroll_on(&mut self) -> LcdResult<()> {
        self.set_entry_mode(self.state.entry_direction, true)
    }

    pub fn set_autoscroll_off(&mut self) -> LcdResult<()> {
        self.set_entry_mode(self.state.entry_direction, false)
    }

    pub fn set_left_to_right(&mut self) -> LcdResult<()> {
        self.set_entry_mode(EntryDirection::LeftToRight, self.state.autoscroll)
    }

    /// Makes writes go right to left. Writes then stop at column 0.
    pub fn set_right_to_left(&mut self) -> LcdResult<()> {
        self.set_entry_mode(EntryDirection::RightToLeft, self.state.autoscroll)
    }

    /// Turns the display on. DDRAM content is kept while it is off.
    pub fn set_display_on(&mut self) -> LcdResult<()> {
        self.set_display_control(true, self.state.cursor_type)
    }

    pub fn set_display_off(&mut self) -> LcdResult<()> {
        self.set_display_control(false, self.state.cursor_type)
    }

    pub fn set_cursor_type(&mut self, cursor_type: CursorType) -> LcdResult<()> {
        self.set_display_control(self.state.display_on, cursor_type)
    }

    pub fn set_backlight_on(&mut self) -> LcdResult<()> {
        self.set_backlight("set_backlight_on", true)
    }

    pub fn set_backlight_off(&mut self) -> LcdResult<()> {
        self.set_backlight("set_backlight_off", false)
    }

    /// Sends an arbitrary command, returning the byte read for read commands.
    ///
    /// The driver's state and cursor follow whatever the command changes.
    pub fn execute_command(&mut self, command: Command) -> LcdResult<Option<u8>> {
        if command.is_read() {
            self.capabilities()
                .require("execute_command", Capability::Read)?;
            self.issue_read(command).map(Some)
        } else {
            self.issue(command).map(|_| None)
        }
    }

    /// Gets whether [Self::execute_command] can send `command` over this transport.
    pub fn is_command_supported(&self, command: &Command) -> bool {
        !command.is_read() || self.capabilities().supports_read
    }

    fn set_entry_mode(&mut self, direction: EntryDirection, autoscroll: bool) -> LcdResult<()> {
        debug!("Entry mode: {:?}, autoscroll: {}", direction, autoscroll);
        self.issue(Command::EntryModeSet {
            direction,
            autoscroll,
        })
    }

    fn set_display_control(&mut self, display_on: bool, cursor: CursorType) -> LcdResult<()> {
        debug!("Display on: {}, cursor: {:?}", display_on, cursor);
        self.issue(Command::DisplayControl { display_on, cursor })
    }

    fn set_backlight(&mut self, operation: &'static str, on: bool) -> LcdResult<()> {
        self.capabilities()
            .require(operation, Capability::Backlight)?;
        self.encoder.set_backlight(on)?;
        debug!("Backlight on: {}", on);
        self.state.backlight_on = on;
        Ok(())
    }

    /// Writes a glyph to CGRAM. In right to left mode the address counter counts down, so the
    /// rows are sent bottom first.
    fn write_glyph(&mut self, slot: u8, glyph: &Glyph) -> LcdResult<()> {
        let base = slot << 3;
        debug!("Writing glyph {} to CGRAM {:#04X}", slot, base);
        match self.state.entry_direction {
            EntryDirection::LeftToRight => {
                self.issue(Command::SetCgramAddress(base))?;
                for &row in glyph {
                    self.issue(Command::WriteData(row))?;
                }
            }
            EntryDirection::RightToLeft => {
                self.issue(Command::SetCgramAddress(base + 7))?;
                for &row in glyph.iter().rev() {
                    self.issue(Command::WriteData(row))?;
                }
            }
        }
        Ok(())
    }

    /// Points the address counter at `position` unless it already is.
    fn seek(&mut self, position: CursorPosition) -> LcdResult<()> {
        if self.cursor_synced && self.cursor == position {
            return Ok(());
        }
        self.issue(Command::SetDdramAddress(position.address()))
    }

    fn issue(&mut self, command: Command) -> LcdResult<()> {
        self.encoder.write(command)?;
        self.track(command);
        Ok(())
    }

    fn issue_read(&mut self, command: Command) -> LcdResult<u8> {
        let value = self.encoder.read(command)?;
        self.track(command);
        Ok(value)
    }

    /// Follows the controller's address counter after `command` was executed.
    fn track(&mut self, command: Command) {
        self.state.apply(&command);
        match command {
            Command::ClearDisplay | Command::ReturnHome => self.set_tracked(Ok(CursorPosition::HOME)),
            Command::SetDdramAddress(address) => {
                self.set_tracked(CursorPosition::from_address(address))
            }
            Command::SetCgramAddress(_) => {
                self.cursor_known = false;
                self.cursor_synced = false;
            }
            Command::WriteData(_) | Command::ReadData => {
                self.advance(self.state.entry_direction.into())
            }
            Command::CursorDisplayShift {
                target: ShiftTarget::Cursor,
                direction,
            } => self.advance(direction),
            _ => {}
        }
    }

    fn set_tracked(&mut self, position: LcdResult<CursorPosition>) {
        match position {
            Ok(position) => {
                self.cursor = position;
                self.cursor_known = true;
                self.cursor_synced = true;
            }
            Err(_) => {
                self.cursor_known = false;
                self.cursor_synced = false;
            }
        }
    }

    /// Steps the tracked cursor like the address counter. After crossing to the other line,
    /// the next positioned access sets the address again.
    fn advance(&mut self, direction: CursorDirection) {
        if !self.cursor_known {
            return;
        }
        let next = self.cursor.step(direction);
        if next.line != self.cursor.line {
            trace!("Address counter left line {}", self.cursor.line);
            self.cursor_synced = false;
        }
        self.cursor = next;
    }
}
