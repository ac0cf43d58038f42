use crate::lcd::hd44780::{Command, CursorType, EntryDirection};

/// The driver's copy of the controller settings it cannot read back.
///
/// Only updated from commands that were sent successfully, so it always mirrors the last
/// state written to the controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct DisplayState {
    pub entry_direction: EntryDirection,
    pub autoscroll: bool,
    pub display_on: bool,
    pub cursor_type: CursorType,
    pub backlight_on: bool,
}

impl DisplayState {
    /// Updates the state after `command` was executed.
    pub fn apply(&mut self, command: &Command) {
        match *command {
            Command::EntryModeSet {
                direction,
                autoscroll,
            } => {
                self.entry_direction = direction;
                self.autoscroll = autoscroll;
            }
            Command::DisplayControl { display_on, cursor } => {
                self.display_on = display_on;
                self.cursor_type = cursor;
            }
            // Clearing sets I/D back to increment but leaves S alone.
            Command::ClearDisplay => self.entry_direction = EntryDirection::LeftToRight,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_restores_left_to_right() {
        let mut state = DisplayState::default();
        state.apply(&Command::EntryModeSet {
            direction: EntryDirection::RightToLeft,
            autoscroll: true,
        });
        state.apply(&Command::ClearDisplay);
        assert_eq!(state.entry_direction, EntryDirection::LeftToRight);
        assert!(state.autoscroll);
    }

    #[test]
    fn display_control_survives_data_writes() {
        let mut state = DisplayState::default();
        let command = Command::DisplayControl {
            display_on: true,
            cursor: CursorType::Both,
        };
        state.apply(&command);
        state.apply(&Command::WriteData(0x41));
        assert!(state.display_on);
        assert_eq!(state.cursor_type, CursorType::Both);
    }
}
