use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_BASE, INSTRUCTION_SIZE, MEMORY_SIZE, PROGRAM_START,
    REGISTER_COUNT, SPRITE_SHEET, STACK_DEPTH,
};
use crate::error::{Chip8Error, Result};
use crate::timer::Timers;

/// The FrameBuffer is indexed as [y][x]; each cell is 1 (set) or 0 (unset)
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry/borrow/collision flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter, always leaving room to fetch a whole instruction
///
/// Pointer
/// - (sp) the number of return addresses on the stack, never more than 16
///
/// Timers
/// - 2 8-bit timers (delay & sound), shared with whatever ticks them
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x200 is reserved; the font lives at 0x050 and is never overwritten
/// - 32x64 frame buffer
///
/// ## Input
/// - Emulation halts while `register_needing_key` is Some
#[derive(Clone, Debug)]
pub struct State {
    pub(crate) v: [u8; REGISTER_COUNT],
    pub(crate) i: u16,
    pub(crate) pc: u16,
    pub(crate) sp: u8,
    pub(crate) stack: [u16; STACK_DEPTH],
    pub(crate) memory: [u8; MEMORY_SIZE],
    pub(crate) frame_buffer: FrameBuffer,
    pub(crate) draw_flag: bool,
    pub(crate) register_needing_key: Option<u8>,
    pub(crate) timers: Timers,
    pub(crate) rng: StdRng,
}

impl State {
    pub fn new() -> Self {
        Self::with_rng(Timers::new(), StdRng::from_entropy())
    }

    pub(crate) fn with_rng(timers: Timers, rng: StdRng) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        let font = FONT_BASE as usize;
        memory[font..font + SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            stack: [0; STACK_DEPTH],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            register_needing_key: None,
            timers,
            rng,
        }
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.v
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// The return addresses currently on the stack, oldest first
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp as usize]
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// The register an Fx0A instruction is waiting to fill, if any
    pub fn register_needing_key(&self) -> Option<u8> {
        self.register_needing_key
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    pub fn fetch(&self) -> Result<u16> {
        let word = self.slice(self.pc as usize, INSTRUCTION_SIZE as usize)?;
        Ok(u16::from(word[0]) << 8 | u16::from(word[1]))
    }

    /// Checks that a whole instruction can be fetched from `addr`
    fn checked_pc(addr: u16) -> Result<u16> {
        if addr as usize + INSTRUCTION_SIZE as usize > MEMORY_SIZE {
            Err(Chip8Error::OutOfBoundsAccess {
                address: addr as usize,
            })
        } else {
            Ok(addr)
        }
    }

    /// pc = addr
    pub(crate) fn jump(&mut self, addr: u16) -> Result<()> {
        self.pc = Self::checked_pc(addr)?;
        Ok(())
    }

    /// Moves on to the next instruction
    pub(crate) fn advance(&mut self) -> Result<()> {
        self.jump(self.pc + INSTRUCTION_SIZE)
    }

    /// Moves on to the next instruction, skipping one first if `condition` holds
    pub(crate) fn skip_if(&mut self, condition: bool) -> Result<()> {
        let distance = if condition { 2 } else { 1 };
        self.jump(self.pc + distance * INSTRUCTION_SIZE)
    }

    /// STACK.push(pc + 2); pc = target
    pub(crate) fn call(&mut self, target: u16) -> Result<()> {
        if self.sp as usize == STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { address: self.pc });
        }
        let target = Self::checked_pc(target)?;
        self.stack[self.sp as usize] = self.pc + INSTRUCTION_SIZE;
        self.sp += 1;
        self.pc = target;
        Ok(())
    }

    /// pc = STACK.pop()
    pub(crate) fn ret(&mut self) -> Result<()> {
        let top = match self.sp.checked_sub(1) {
            Some(top) => top,
            None => return Err(Chip8Error::StackUnderflow { address: self.pc }),
        };
        self.jump(self.stack[top as usize])?;
        self.sp = top;
        Ok(())
    }

    /// Borrows `len` bytes of memory starting at `addr`
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8]> {
        let end = addr + len;
        if end > MEMORY_SIZE {
            // Report the first address that doesn't exist
            return Err(Chip8Error::OutOfBoundsAccess {
                address: addr.max(MEMORY_SIZE),
            });
        }
        Ok(&self.memory[addr..end])
    }

    /// Checks that `len` bytes starting at `addr` lie within memory and miss the font
    pub(crate) fn check_writable(&self, addr: usize, len: usize) -> Result<()> {
        let font = FONT_BASE as usize..FONT_BASE as usize + SPRITE_SHEET.len();
        if len > 0 && addr < font.end && addr + len > font.start {
            return Err(Chip8Error::ReservedWrite {
                address: addr.max(font.start),
            });
        }
        if addr + len > MEMORY_SIZE {
            return Err(Chip8Error::OutOfBoundsAccess {
                address: addr.max(MEMORY_SIZE),
            });
        }
        Ok(())
    }

    /// Copies `bytes` into memory starting at `addr`.
    /// Nothing is written unless the whole range is writable.
    pub(crate) fn write(&mut self, addr: usize, bytes: &[u8]) -> Result<()> {
        self.check_writable(addr, bytes.len())?;
        self.memory[addr..addr + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Unsets every pixel
    pub(crate) fn clear_screen(&mut self) {
        self.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        self.draw_flag = true;
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
