//! Character resolution: custom glyphs bound to CGRAM slots, and the controller's built-in
//! character set.

use crate::lcd::hd44780::{LcdError, LcdResult};
use log::{debug, warn};

/// Number of programmable glyphs in CGRAM.
pub const SLOTS: usize = 8;

/// A 5x8 glyph, one row per byte, top to bottom. Only the lowest 5 bits of a row are used, bit 4
/// being the leftmost pixel. Row 7 is where the underline cursor is drawn.
pub type Glyph = [u8; 8];

pub const BLANK_GLYPH: Glyph = [0; 8];

const ROW_MASK: u8 = 0b00011111;

/// Returns [LcdError::InvalidSlot] unless `slot` is 0–7.
pub fn validate_slot(slot: u8) -> LcdResult<usize> {
    if slot as usize >= SLOTS {
        return Err(LcdError::InvalidSlot(slot));
    }
    Ok(slot as usize)
}

/// Returns [LcdError::InvalidBitmapRow] for the first row wider than 5 pixels.
pub fn validate_glyph(glyph: &Glyph) -> LcdResult<()> {
    match glyph.iter().position(|row| row & !ROW_MASK != 0) {
        Some(row) => Err(LcdError::InvalidBitmapRow {
            row,
            value: glyph[row],
        }),
        None => Ok(()),
    }
}

/// Bindings from characters to CGRAM slots. A slot holds at most one character, and a
/// character is bound to at most one slot.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CharacterMap {
    slots: [Option<char>; SLOTS],
}

impl CharacterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `character` to `slot`, dropping whatever the slot was bound to and any previous
    /// slot of `character`. Returns the evicted character, if any.
    pub fn bind(&mut self, character: char, slot: u8) -> LcdResult<Option<char>> {
        let index = validate_slot(slot)?;
        self.unbind(character);
        let evicted = self.slots[index].replace(character);
        if let Some(evicted) = evicted {
            warn!("Slot {} rebound from {:?} to {:?}", slot, evicted, character);
        } else {
            debug!("Slot {} bound to {:?}", slot, character);
        }
        Ok(evicted)
    }

    /// Removes the binding of `character`, returning the slot it was bound to.
    pub fn unbind(&mut self, character: char) -> Option<u8> {
        let index = self.slots.iter().position(|c| *c == Some(character))?;
        self.slots[index] = None;
        debug!("Slot {} unbound from {:?}", index, character);
        Some(index as u8)
    }

    pub fn slot_of(&self, character: char) -> Option<u8> {
        self.slots
            .iter()
            .position(|c| *c == Some(character))
            .map(|index| index as u8)
    }

    pub fn character_in(&self, slot: u8) -> Option<char> {
        self.slots.get(slot as usize).copied().flatten()
    }

    pub fn clear(&mut self) {
        self.slots = [None; SLOTS];
    }

    /// Gets the code to send for `character`: its slot if bound, its built-in code otherwise.
    pub fn resolve(&self, character: char) -> LcdResult<u8> {
        self.slot_of(character)
            .or_else(|| native_code(character))
            .ok_or(LcdError::UnresolvableCharacter(character))
    }
}

/// Gets the code of `character` in the controller's character ROM (HD44780U, ROM code A00).
///
/// Covers printable ASCII except `\` and `~`, whose codes hold `¥` and `→`, the half-width
/// katakana block, and the Greek and math symbols of the upper half.
pub fn native_code(character: char) -> Option<u8> {
    let code = match character {
        '\\' | '~' => return None,
        ' '..='}' => character as u8,
        '¥' => 0x5C,
        '→' => 0x7E,
        '←' => 0x7F,
        '\u{FF61}'..='\u{FF9F}' => 0xA1 + (character as u32 - 0xFF61) as u8,
        '°' => 0xDF,
        'α' => 0xE0,
        'ä' => 0xE1,
        'β' => 0xE2,
        'ε' => 0xE3,
        'μ' | 'µ' => 0xE4,
        'σ' => 0xE5,
        'ρ' => 0xE6,
        '√' => 0xE8,
        'ñ' => 0xEE,
        'ö' => 0xEF,
        'θ' => 0xF2,
        '∞' => 0xF3,
        'Ω' => 0xF4,
        'ü' => 0xF5,
        'Σ' => 0xF6,
        'π' => 0xF7,
        '÷' => 0xFD,
        '█' => 0xFF,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_characters_resolve_to_their_slot() {
        let mut map = CharacterMap::new();
        map.bind('♥', 0).unwrap();
        assert_eq!(map.resolve('♥'), Ok(0));
        assert_eq!(map.resolve('I'), Ok(b'I'));
        assert_eq!(map.unbind('♥'), Some(0));
        assert_eq!(map.resolve('♥'), Err(LcdError::UnresolvableCharacter('♥')));
    }

    #[test]
    fn bindings_shadow_built_in_characters() {
        let mut map = CharacterMap::new();
        map.bind('A', 3).unwrap();
        assert_eq!(map.resolve('A'), Ok(3));
        map.unbind('A');
        assert_eq!(map.resolve('A'), Ok(0x41));
    }

    #[test]
    fn rebinding_a_slot_evicts_its_character() {
        let mut map = CharacterMap::new();
        map.bind('♥', 2).unwrap();
        assert_eq!(map.bind('☺', 2), Ok(Some('♥')));
        assert_eq!(map.slot_of('♥'), None);
        assert_eq!(map.character_in(2), Some('☺'));
    }

    #[test]
    fn rebinding_a_character_moves_it() {
        let mut map = CharacterMap::new();
        map.bind('♥', 2).unwrap();
        assert_eq!(map.bind('♥', 5), Ok(None));
        assert_eq!(map.character_in(2), None);
        assert_eq!(map.slot_of('♥'), Some(5));
    }

    #[test]
    fn slots_and_rows_are_validated() {
        assert_eq!(CharacterMap::new().bind('x', 8), Err(LcdError::InvalidSlot(8)));
        assert_eq!(validate_slot(7), Ok(7));
        assert_eq!(
            validate_glyph(&[0, 0, 0b100000, 0, 0, 0, 0, 0]),
            Err(LcdError::InvalidBitmapRow {
                row: 2,
                value: 0b100000
            })
        );
        assert_eq!(validate_glyph(&[0b11111; 8]), Ok(()));
    }

    #[test]
    fn rom_a00_codes() {
        assert_eq!(native_code(' '), Some(0x20));
        assert_eq!(native_code('}'), Some(0x7D));
        assert_eq!(native_code('\\'), None);
        assert_eq!(native_code('~'), None);
        assert_eq!(native_code('¥'), Some(0x5C));
        assert_eq!(native_code('ｱ'), Some(0xB1));
        assert_eq!(native_code('°'), Some(0xDF));
        assert_eq!(native_code('π'), Some(0xF7));
        assert_eq!(native_code('\n'), None);
        assert_eq!(native_code('é'), None);
    }
}
