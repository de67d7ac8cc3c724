/// Bytes of addressable memory.
pub const MEMORY_SIZE: usize = 4096;

/// Programs are loaded here; everything below is reserved for the interpreter.
pub const PROGRAM_START: u16 = 0x200;

/// Largest program that fits between `PROGRAM_START` and the end of memory.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

/// Every instruction is a big-endian 16-bit word.
pub const INSTRUCTION_SIZE: u16 = 2;

pub const REGISTER_COUNT: usize = 16;

/// VF doubles as the carry, borrow and collision flag.
pub const FLAG_REGISTER: usize = 0xF;

/// Maximum number of return addresses the stack can hold.
pub const STACK_DEPTH: usize = 16;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

pub const KEY_COUNT: usize = 16;

/// Where the font sprite sheet lives in reserved memory.
pub const FONT_BASE: u16 = 0x050;

/// Height in bytes of a single font glyph.
pub const FONT_GLYPH_SIZE: u16 = 5;

/// Default number of instructions executed per second.
pub const CLOCK_HZ: u64 = 500;

/// Delay and sound timers count down at 60Hz.
pub const TIMER_HZ: u64 = 60;

/// How many past states are kept around for rewinding.
pub const MAX_SAVED_STATES: usize = 600;

/// # Sprite Sheet
/// Hex digits 0..F, each 4 pixels wide and 5 rows tall.
/// Only the high nibble of every row is drawn.
/// ```text
/// 0xF0  ####
/// 0x90  #  #
/// 0x90  #  #
/// 0x90  #  #
/// 0xF0  ####
/// ```
#[rustfmt::skip]
pub const SPRITE_SHEET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
