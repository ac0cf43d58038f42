//! The HD44780 instruction set.
//!
//! Every instruction is modelled as a [Command] value carrying its operands. A command knows its
//! register select and read/write lines, its 8-bit opcode and how long the controller needs to
//! execute it. The raw 10-bit form (`RS RW DB7 DB6 DB5 DB4 DB3 DB2 DB1 DB0`) is available through
//! [Command::to_raw] and [Command::from_raw] for callers that think in datasheet bit patterns.
//!
//! See the HD44780U datasheet, table 6 (pages 24–25).

use crate::lcd::hd44780::{LcdError, LcdResult};
use std::fmt::{Display, Formatter};

const RAW_RS: u16 = 0b10_0000_0000;
const RAW_RW: u16 = 0b01_0000_0000;
const RAW_MAX: u16 = 0b11_1111_1111;

/// Bus width announced to the controller by the function set instruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusWidth {
    Four,
    Eight,
}

impl BusWidth {
    pub fn bits(&self) -> u8 {
        match self {
            BusWidth::Four => 4,
            BusWidth::Eight => 8,
        }
    }
}

/// Direction in which the address counter moves after each data read or write.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum EntryDirection {
    /// The address increments (I/D = 1).
    #[default]
    LeftToRight,
    /// The address decrements (I/D = 0).
    RightToLeft,
}

/// The visible cursor, as set by the `C` and `B` bits of the display control instruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CursorType {
    #[default]
    None,
    /// Blinking block.
    Blink,
    /// Underscore on the 8th row of the cell.
    Underline,
    /// Underscore with the blinking block on top.
    Both,
}

impl CursorType {
    /// Converts the cursor type to the `C` and `B` bits of the display control instruction.
    pub fn to_mask(&self) -> u8 {
        match self {
            CursorType::None =>      0b00000000,
            CursorType::Blink =>     0b00000001,
            CursorType::Underline => 0b00000010,
            CursorType::Both =>      0b00000011,
        }
    }

    fn from_mask(mask: u8) -> Self {
        match mask & 0b11 {
            0b00 => CursorType::None,
            0b01 => CursorType::Blink,
            0b10 => CursorType::Underline,
            _ => CursorType::Both,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    Left,
    Right,
}

/// What the cursor/display shift instruction moves.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShiftTarget {
    /// Only the address counter (and the visible cursor) moves.
    Cursor,
    /// The whole viewport moves; the address counter is untouched.
    Display,
}

/// How long the controller needs after an instruction before accepting the next one.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SettleClass {
    /// 37 µs at 270 kHz.
    Short,
    /// 1.52 ms at 270 kHz. Clear display and return home only.
    Long,
}

/// One HD44780 instruction with its operands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    /// Writes blanks (`0x20`) to all of DDRAM, returns home and resets the entry direction to
    /// left to right.
    ClearDisplay,
    /// Sets the address counter to `0x00` and undoes any display shift.
    ReturnHome,
    /// Command: `000001IS`. `I` is `1` to increment the address, `S` is `1` to shift the display
    /// on every write (autoscroll).
    EntryModeSet {
        direction: EntryDirection,
        autoscroll: bool,
    },
    /// Command: `00001DCB`. `D` turns the display on, `C` the underscore cursor and `B` the
    /// blinking block.
    DisplayControl { display_on: bool, cursor: CursorType },
    /// Command: `0001SR??`. `S` is `1` to shift the display, `0` to move the cursor.
    /// `R` is `1` for right, `0` for left.
    CursorDisplayShift {
        target: ShiftTarget,
        direction: CursorDirection,
    },
    /// Command: `001DNF??`. `D` is `1` for an 8-bit bus, `N` is `1` for two lines, `F` is `1`
    /// for the 5x10 font.
    FunctionSet {
        bus_width: BusWidth,
        two_lines: bool,
        large_font: bool,
    },
    /// Command: `01AAAAAA`. Selects CGRAM for the following data reads and writes.
    SetCgramAddress(u8),
    /// Command: `1AAAAAAA`. Selects DDRAM for the following data reads and writes.
    SetDdramAddress(u8),
    /// Writes a byte to the selected RAM (RS = 1, RW = 0).
    WriteData(u8),
    /// Reads a byte from the selected RAM (RS = 1, RW = 1).
    ReadData,
    /// Reads the busy flag (bit 7) and the address counter (bits 0–6) (RS = 0, RW = 1).
    ReadBusyAddress,
}

impl Command {
    /// Gets the level of the RS line for this command: `true` for data, `false` for instructions.
    pub fn register_select(&self) -> bool {
        matches!(self, Command::WriteData(_) | Command::ReadData)
    }

    /// Gets whether the command reads from the controller (RW = 1).
    pub fn is_read(&self) -> bool {
        matches!(self, Command::ReadData | Command::ReadBusyAddress)
    }

    /// Gets how long the controller takes to execute the command.
    pub fn settle(&self) -> SettleClass {
        match self {
            Command::ClearDisplay | Command::ReturnHome => SettleClass::Long,
            _ => SettleClass::Short,
        }
    }

    /// Builds the byte put on DB7–DB0. Read commands put nothing on the bus and encode as `0`.
    ///
    /// Returns [LcdError::InvalidOperand] if an address does not fit its instruction.
    pub fn encode(&self) -> LcdResult<u8> {
        let byte = match *self {
            Command::ClearDisplay => 0b00000001,
            Command::ReturnHome => 0b00000010,
            Command::EntryModeSet {
                direction,
                autoscroll,
            } => {
                let mut command = 0b00000100;
                if direction == EntryDirection::LeftToRight {
                    command |= 0b00000010;
                }
                if autoscroll {
                    command |= 0b00000001;
                }
                command
            }
            Command::DisplayControl { display_on, cursor } => {
                let mut command = 0b00001000 | cursor.to_mask();
                if display_on {
                    command |= 0b00000100;
                }
                command
            }
            Command::CursorDisplayShift { target, direction } => {
                let mut command = 0b00010000;
                if target == ShiftTarget::Display {
                    command |= 0b00001000;
                }
                if direction == CursorDirection::Right {
                    command |= 0b00000100;
                }
                command
            }
            Command::FunctionSet {
                bus_width,
                two_lines,
                large_font,
            } => {
                let mut command = 0b00100000;
                if bus_width == BusWidth::Eight {
                    command |= 0b00010000;
                }
                if two_lines {
                    command |= 0b00001000;
                }
                if large_font {
                    command |= 0b00000100;
                }
                command
            }
            Command::SetCgramAddress(address) => {
                if address > 0b00111111 {
                    return Err(LcdError::InvalidOperand(*self));
                }
                0b01000000 | address
            }
            Command::SetDdramAddress(address) => {
                if address > 0b01111111 {
                    return Err(LcdError::InvalidOperand(*self));
                }
                0b10000000 | address
            }
            Command::WriteData(data) => data,
            Command::ReadData | Command::ReadBusyAddress => 0,
        };
        Ok(byte)
    }

    /// Converts the command to its 10-bit `RS RW DB7..DB0` form.
    pub fn to_raw(&self) -> LcdResult<u16> {
        let mut raw = self.encode()? as u16;
        if self.register_select() {
            raw |= RAW_RS;
        }
        if self.is_read() {
            raw |= RAW_RW;
        }
        Ok(raw)
    }

    /// Decodes a 10-bit `RS RW DB7..DB0` value.
    ///
    /// For instructions, the highest set data bit selects the instruction and the bits marked
    /// `?` in the datasheet are ignored. For reads, the data bits are ignored.
    pub fn from_raw(raw: u16) -> LcdResult<Command> {
        if raw > RAW_MAX {
            return Err(LcdError::InvalidRawCommand(raw));
        }
        let data = (raw & 0xFF) as u8;
        let bit = |mask: u8| data & mask != 0;

        let command = match (raw & RAW_RS != 0, raw & RAW_RW != 0) {
            (true, false) => Command::WriteData(data),
            (true, true) => Command::ReadData,
            (false, true) => Command::ReadBusyAddress,
            (false, false) => match data.leading_zeros() {
                0 => Command::SetDdramAddress(data & 0b01111111),
                1 => Command::SetCgramAddress(data & 0b00111111),
                2 => Command::FunctionSet {
                    bus_width: if bit(0b00010000) { BusWidth::Eight } else { BusWidth::Four },
                    two_lines: bit(0b00001000),
                    large_font: bit(0b00000100),
                },
                3 => Command::CursorDisplayShift {
                    target: if bit(0b00001000) { ShiftTarget::Display } else { ShiftTarget::Cursor },
                    direction: if bit(0b00000100) { CursorDirection::Right } else { CursorDirection::Left },
                },
                4 => Command::DisplayControl {
                    display_on: bit(0b00000100),
                    cursor: CursorType::from_mask(data),
                },
                5 => Command::EntryModeSet {
                    direction: if bit(0b00000010) {
                        EntryDirection::LeftToRight
                    } else {
                        EntryDirection::RightToLeft
                    },
                    autoscroll: bit(0b00000001),
                },
                6 => Command::ReturnHome,
                7 => Command::ClearDisplay,
                _ => return Err(LcdError::InvalidRawCommand(raw)),
            },
        };
        Ok(command)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_raw() {
            Ok(raw) => write!(f, "{:?} [{:010b}]", self, raw),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
