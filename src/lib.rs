pub use chip8::{Chip8, Step};
pub use constants::CLOCK_HZ;
pub use error::{Chip8Error, Result};
pub use keypad::Keypad;
pub use operations::{add_with_carry, sub_with_borrow};
pub use state::{FrameBuffer, State};
pub use timer::{TimerTicker, Timers};

mod chip8;
pub mod constants;
mod error;
mod instruction;
mod keypad;
mod opcode;
mod operations;
mod state;
mod timer;
