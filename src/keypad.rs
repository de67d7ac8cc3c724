use crate::constants::KEY_COUNT;
use crate::error::{Chip8Error, Result};

/// # Keypad
/// Chip-8 input is generated with a 16 key hexadecimal keypad.
/// ```text
/// |1|2|3|C|
/// |4|5|6|D|
/// |7|8|9|E|
/// |A|0|B|F|
/// ```
/// Tracks which keys are currently held down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keypad {
    pressed: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `key` names one of the 16 keys
    pub fn validate(key: u8) -> Result<u8> {
        if (key as usize) < KEY_COUNT {
            Ok(key)
        } else {
            Err(Chip8Error::InvalidKey { key })
        }
    }

    pub fn press(&mut self, key: u8) -> Result<()> {
        self.pressed[Self::validate(key)? as usize] = true;
        Ok(())
    }

    pub fn release(&mut self, key: u8) -> Result<()> {
        self.pressed[Self::validate(key)? as usize] = false;
        Ok(())
    }

    /// Whether `key` is held; only the low nibble is looked at
    pub fn is_pressed(&self, key: u8) -> bool {
        self.pressed[(key & 0xF) as usize]
    }
}
