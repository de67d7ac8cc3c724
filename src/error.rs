use thiserror::Error;

pub type Result<T> = std::result::Result<T, Chip8Error>;

/// Everything that can stop the machine.
///
/// All of these are fatal to the step that produced them; the machine is left
/// as it was before that step.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("invalid opcode {opcode:#06X} at {address:#05X}")]
    InvalidOpcode { opcode: u16, address: u16 },

    #[error("stack overflow calling from {address:#05X}")]
    StackOverflow { address: u16 },

    #[error("stack underflow returning from {address:#05X}")]
    StackUnderflow { address: u16 },

    #[error("memory access out of bounds at {address:#06X}")]
    OutOfBoundsAccess { address: usize },

    #[error("write to reserved memory at {address:#05X}")]
    ReservedWrite { address: usize },

    #[error("ROM is {size} bytes but at most {max} bytes fit in memory")]
    RomTooLarge { size: usize, max: usize },

    #[error("key {key:#04X} is not on the keypad")]
    InvalidKey { key: u8 },

    #[error("key event source closed while waiting for a key press")]
    KeyWaitCancelled,

    #[error("unable to read ROM: {0}")]
    Io(#[from] std::io::Error),
}
