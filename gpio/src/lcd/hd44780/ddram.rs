//! Translation between screen positions and DDRAM addresses.

use crate::lcd::hd44780::{CursorDirection, EntryDirection, LcdError, LcdResult};

/// Columns of DDRAM per line. Only the first 16 are visible without scrolling.
pub const COLUMNS: u8 = 40;
pub const LINES: u8 = 2;

const LINE_OFFSETS: [u8; LINES as usize] = [0x00, 0x40];

/// A (column, line) position in DDRAM.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct CursorPosition {
    pub column: u8,
    pub line: u8,
}

impl CursorPosition {
    pub const HOME: CursorPosition = CursorPosition { column: 0, line: 0 };

    /// Returns [LcdError::InvalidPosition] unless `column` is 0–39 and `line` is 0 or 1.
    pub fn new(column: u8, line: u8) -> LcdResult<Self> {
        if column >= COLUMNS || line >= LINES {
            return Err(LcdError::InvalidPosition { column, line });
        }
        Ok(CursorPosition { column, line })
    }

    pub fn address(&self) -> u8 {
        LINE_OFFSETS[self.line as usize] + self.column
    }

    /// Converts a DDRAM address back to a position.
    ///
    /// Addresses between the two line segments (`0x28..=0x3F`, `0x68..=0x7F`) are
    /// [LcdError::InvalidPosition].
    pub fn from_address(address: u8) -> LcdResult<Self> {
        let line = (address >> 6) & 0b1;
        let column = address & 0b00111111;
        if address > 0b01111111 || column >= COLUMNS {
            return Err(LcdError::InvalidPosition { column, line });
        }
        Ok(CursorPosition { column, line })
    }

    /// Gets the position the address counter moves to after one step, wrapping from the end
    /// of one line to the start of the other like the controller does in 2-line mode.
    pub fn step(&self, direction: CursorDirection) -> Self {
        let other_line = 1 - self.line;
        match direction {
            CursorDirection::Right if self.column == COLUMNS - 1 => CursorPosition {
                column: 0,
                line: other_line,
            },
            CursorDirection::Right => CursorPosition {
                column: self.column + 1,
                line: self.line,
            },
            CursorDirection::Left if self.column == 0 => CursorPosition {
                column: COLUMNS - 1,
                line: other_line,
            },
            CursorDirection::Left => CursorPosition {
                column: self.column - 1,
                line: self.line,
            },
        }
    }

    /// Gets how many cells can be written from this position before reaching the end of the
    /// line in `direction`, this one included.
    pub fn room(&self, direction: EntryDirection) -> usize {
        match direction {
            EntryDirection::LeftToRight => (COLUMNS - self.column) as usize,
            EntryDirection::RightToLeft => self.column as usize + 1,
        }
    }
}

impl From<EntryDirection> for CursorDirection {
    fn from(direction: EntryDirection) -> Self {
        match direction {
            EntryDirection::LeftToRight => CursorDirection::Right,
            EntryDirection::RightToLeft => CursorDirection::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn addresses_of_line_starts_and_ends() {
        assert_eq!(CursorPosition::new(0, 0).unwrap().address(), 0x00);
        assert_eq!(CursorPosition::new(39, 0).unwrap().address(), 0x27);
        assert_eq!(CursorPosition::new(0, 1).unwrap().address(), 0x40);
        assert_eq!(CursorPosition::new(39, 1).unwrap().address(), 0x67);
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        assert_eq!(
            CursorPosition::new(40, 0),
            Err(LcdError::InvalidPosition { column: 40, line: 0 })
        );
        assert_eq!(
            CursorPosition::new(0, 2),
            Err(LcdError::InvalidPosition { column: 0, line: 2 })
        );
        assert!(CursorPosition::from_address(0x28).is_err());
        assert!(CursorPosition::from_address(0x7F).is_err());
        assert!(CursorPosition::from_address(0x80).is_err());
    }

    #[test]
    fn steps_wrap_to_the_other_line() {
        let end_of_first = CursorPosition::new(39, 0).unwrap();
        assert_eq!(end_of_first.step(CursorDirection::Right), CursorPosition::new(0, 1).unwrap());
        let end_of_second = CursorPosition::new(39, 1).unwrap();
        assert_eq!(end_of_second.step(CursorDirection::Right), CursorPosition::HOME);
        assert_eq!(
            CursorPosition::HOME.step(CursorDirection::Left),
            CursorPosition::new(39, 1).unwrap()
        );
        assert_eq!(
            CursorPosition::new(0, 1).unwrap().step(CursorDirection::Left),
            end_of_first
        );
    }

    #[test]
    fn room_depends_on_direction() {
        let position = CursorPosition::new(5, 1).unwrap();
        assert_eq!(position.room(EntryDirection::LeftToRight), 35);
        assert_eq!(position.room(EntryDirection::RightToLeft), 6);
    }

    proptest! {
        #[test]
        fn address_round_trips(column in 0u8..40, line in 0u8..2) {
            let position = CursorPosition::new(column, line).unwrap();
            prop_assert_eq!(CursorPosition::from_address(position.address()), Ok(position));
        }

        #[test]
        fn invalid_positions_never_translate(column in 40u8.., line in 2u8..) {
            prop_assert!(CursorPosition::new(column, 0).is_err());
            prop_assert!(CursorPosition::new(0, line).is_err());
        }

        #[test]
        fn steps_are_reversible(column in 0u8..40, line in 0u8..2) {
            let position = CursorPosition::new(column, line).unwrap();
            prop_assert_eq!(position.step(CursorDirection::Right).step(CursorDirection::Left), position);
        }
    }
}
