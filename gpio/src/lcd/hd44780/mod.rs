//! HD44780 character LCD, as found on the ubiquitous 16x2 "LCD1602" modules.
//!
//! The module is layered bottom-up:
//!
//! - [driver] moves bytes to and from the controller over GPIO (4-bit or 8-bit bus) or over a
//!   PCF8574 I2C backpack;
//! - [command] models the instruction set;
//! - [timing] issues commands and waits for them to finish, polling the busy flag when the
//!   transport can read;
//! - [ddram], [charmap] and [state] hold the driver's view of the controller;
//! - [lcd1602] ties everything together into the [Lcd1602] driver.
//!
//! The controller's DDRAM holds 40 columns per line, of which a 16x2 module shows 16. Both
//! lines are separate address segments (`0x00..=0x27` and `0x40..=0x67`), so writes never run
//! from one line into the other.

pub mod charmap;
pub mod command;
pub mod ddram;
pub mod driver;
mod error;
pub mod lcd1602;
pub mod state;
pub mod timing;

#[cfg(test)]
pub(crate) mod mock;

pub use charmap::{CharacterMap, Glyph};
pub use command::{
    BusWidth, Command, CursorDirection, CursorType, EntryDirection, SettleClass, ShiftTarget,
};
pub use ddram::CursorPosition;
pub use error::{Capability, LcdError, LcdResult};
pub use lcd1602::Lcd1602;
pub use state::DisplayState;
pub use timing::TimingConfig;
