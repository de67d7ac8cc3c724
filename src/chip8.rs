use std::collections::VecDeque;
use std::io::Read;
use std::sync::mpsc::Receiver;

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{MAX_ROM_SIZE, MAX_SAVED_STATES, PROGRAM_START};
use crate::error::{Chip8Error, Result};
use crate::instruction;
use crate::keypad::Keypad;
use crate::state::{FrameBuffer, State};
use crate::timer::Timers;

/// What a call to `Chip8::step` did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// One instruction was executed
    Executed,
    /// Nothing was executed; an Fx0A instruction is waiting for a key to fill `register`
    AwaitingKey { register: u8 },
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `previous_states` for rewinding
///  - the `keypad` with public interfaces for manipulating it
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing and reversing the CPU
/// - sharing its timers with a `TimerTicker`
/// - inspecting its frame buffer for rendering by some display
pub struct Chip8 {
    state: State,
    previous_states: VecDeque<State>,
    keypad: Keypad,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::from_state(State::new())
    }

    /// A Chip-8 whose random number generator is seeded, for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self::from_state(State::with_rng(Timers::new(), StdRng::seed_from_u64(seed)))
    }

    fn from_state(state: State) -> Self {
        Chip8 {
            state,
            previous_states: VecDeque::with_capacity(MAX_SAVED_STATES),
            keypad: Keypad::new(),
        }
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    ///
    /// Returns the number of bytes loaded
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<usize> {
        let mut rom = Vec::new();
        reader.read_to_end(&mut rom)?;
        self.load_bytes(&rom)?;
        Ok(rom.len())
    }

    /// Copy a program into memory at 0x200.
    /// Programs that don't fit are rejected and memory is left untouched.
    pub fn load_bytes(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.state.write(PROGRAM_START as usize, rom)?;
        debug!("loaded {} byte ROM at {:#05X}", rom.len(), PROGRAM_START);
        Ok(())
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// A handle to the delay and sound timers, suitable for handing to a `TimerTicker`
    pub fn timers(&self) -> Timers {
        self.state.timers.clone()
    }

    /// The current contents of the display
    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if the display should be redrawn
    /// - the display needs redrawing after any clear or draw since the last call
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(self.state.frame_buffer)
        } else {
            None
        }
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Set the pressed status of key
    /// - if an Fx0A instruction is waiting it receives the key and the CPU resumes
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) -> Result<()> {
        self.keypad.press(key)?;
        self.resume(key)
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) -> Result<()> {
        self.keypad.release(key)
    }

    /// Hands a key to a waiting Fx0A instruction and moves past it
    fn resume(&mut self, key: u8) -> Result<()> {
        let key = Keypad::validate(key)?;
        if let Some(register) = self.state.register_needing_key {
            self.state.advance()?;
            self.state.v[register as usize] = key;
            self.state.register_needing_key = None;
            trace!("V{:X} received key {:X}", register, key);
        }
        Ok(())
    }

    /// Blocks until a key press arrives on `events` if an Fx0A instruction is waiting.
    /// Returns straight away otherwise.
    ///
    /// Keys received this way are treated as momentary: they fill the register but
    /// aren't marked as held.
    ///
    /// Fails with `KeyWaitCancelled` if every sender hangs up first.
    pub fn wait_for_key(&mut self, events: &Receiver<u8>) -> Result<()> {
        while self.state.register_needing_key.is_some() {
            let key = events.recv().map_err(|_| Chip8Error::KeyWaitCancelled)?;
            match self.resume(key) {
                Err(Chip8Error::InvalidKey { key }) => {
                    warn!("ignoring key {:#04X} while waiting for a key press", key)
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Advances the CPU by a single cycle
    /// - does nothing if awaiting a keypress
    /// - gets and executes the next opcode
    ///
    /// A failed step leaves the machine as it was.
    pub fn step(&mut self) -> Result<Step> {
        if let Some(register) = self.state.register_needing_key {
            return Ok(Step::AwaitingKey { register });
        }

        let result = self.execute();
        if let Err(e) = &result {
            debug!("step failed at pc {:#05X}: {}", self.state.pc, e);
        }
        result.map(|()| Step::Executed)
    }

    fn execute(&mut self) -> Result<()> {
        let pc = self.state.pc;
        let op = self.state.fetch()?;
        let operation = instruction::from_op(&op, pc)?;
        trace!(
            "{:04X} v{:02X?} i{:04X} pc{:04X}",
            op,
            self.state.v,
            self.state.i,
            pc
        );

        let previous = self.state.clone();
        operation(&op, &mut self.state, &self.keypad)?;
        self.save_state(previous);
        Ok(())
    }

    /// Reverses the CPU by a single cycle if possible
    /// - if there are previous_states, pops the last one and restores it
    /// - timers keep counting and are not restored
    pub fn reverse_cpu(&mut self) {
        if let Some(state) = self.previous_states.pop_front() {
            self.state = state;
            debug!("rewound to pc {:#05X}", self.state.pc);
        }
    }

    /// How many steps can currently be reversed
    pub fn saved_states(&self) -> usize {
        self.previous_states.len()
    }

    /// Puts a state in previous_states
    /// - if there are already MAX_SAVED_STATES saved then the oldest is dropped
    fn save_state(&mut self, state: State) {
        if self.previous_states.len() == MAX_SAVED_STATES {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(state);
    }

    /// Returns the machine to its power-on state, keeping the loaded program.
    /// The timers are zeroed but stay shared with any running ticker.
    pub fn reset(&mut self) {
        let timers = self.state.timers.clone();
        timers.set_delay(0);
        timers.set_sound(0);

        let mut state = State::with_rng(timers, self.state.rng.clone());
        let program = PROGRAM_START as usize..;
        state.memory[program.clone()].copy_from_slice(&self.state.memory[program]);
        self.state = state;
        self.previous_states.clear();
        debug!("reset");
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_step_advances_pc() {
        let mut chip8 = Chip8::new();
        // insert a cls opcode so there's something valid to execute
        chip8.load_bytes(&[0x00, 0xE0]).unwrap();
        assert_eq!(chip8.step().unwrap(), Step::Executed);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_step_rejects_invalid_opcode() {
        let mut chip8 = Chip8::new();
        chip8.load_bytes(&[0xFF, 0xFF]).unwrap();
        assert!(matches!(
            chip8.step(),
            Err(Chip8Error::InvalidOpcode {
                opcode: 0xFFFF,
                address: 0x200
            })
        ));
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.saved_states(), 0);
    }

    #[test]
    fn test_load_rom_from_reader() {
        let mut chip8 = Chip8::new();
        let mut rom: &[u8] = &[0x12, 0x00];
        assert_eq!(chip8.load_rom(&mut rom).unwrap(), 2);
        assert_eq!(chip8.state.memory[0x200..0x202], [0x12, 0x00]);
    }

    #[test]
    fn test_load_largest_rom() {
        let mut chip8 = Chip8::new();
        chip8.load_bytes(&[0xAA; MAX_ROM_SIZE]).unwrap();
        assert_eq!(chip8.state.memory[0xFFF], 0xAA);
    }

    #[test]
    fn test_load_rejects_oversized_rom() {
        let mut chip8 = Chip8::new();
        assert!(matches!(
            chip8.load_bytes(&[0xAA; MAX_ROM_SIZE + 1]),
            Err(Chip8Error::RomTooLarge { size: 3585, max: 3584 })
        ));
        assert!(chip8.state.memory[0x200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_doesnt_cycle_while_register_needs_key() {
        let mut chip8 = Chip8::new();
        chip8.load_bytes(&[0xF3, 0x0A]).unwrap();
        assert_eq!(chip8.step().unwrap(), Step::Executed);
        assert_eq!(chip8.step().unwrap(), Step::AwaitingKey { register: 0x3 });
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_captures_key_presses() {
        let mut chip8 = Chip8::new();
        chip8.state.register_needing_key = Some(0x1);
        chip8.key_press(0xE).unwrap();
        assert_eq!(chip8.state.register_needing_key, None);
        assert_eq!(chip8.state.v[0x1], 0xE);
        assert_eq!(chip8.state.pc, 0x202);
        assert!(chip8.keypad.is_pressed(0xE));
    }

    #[test]
    fn test_key_press_without_waiting_register() {
        let mut chip8 = Chip8::new();
        chip8.key_press(0x4).unwrap();
        assert_eq!(chip8.state.pc, 0x200);
        chip8.key_release(0x4).unwrap();
        assert!(!chip8.keypad.is_pressed(0x4));
    }

    #[test]
    fn test_invalid_key_press_doesnt_resume() {
        let mut chip8 = Chip8::new();
        chip8.state.register_needing_key = Some(0x1);
        assert!(chip8.key_press(0x10).is_err());
        assert_eq!(chip8.state.register_needing_key, Some(0x1));
    }

    #[test]
    fn test_wait_for_key_resumes_from_channel() {
        let mut chip8 = Chip8::new();
        chip8.load_bytes(&[0xF5, 0x0A]).unwrap();
        chip8.step().unwrap();

        let (sender, events) = mpsc::channel();
        let presser = thread::spawn(move || {
            sender.send(0x42).unwrap();
            sender.send(0x7).unwrap();
        });
        chip8.wait_for_key(&events).unwrap();
        presser.join().unwrap();

        assert_eq!(chip8.state.v[0x5], 0x7);
        assert_eq!(chip8.state.pc, 0x202);
        assert!(!chip8.keypad.is_pressed(0x7));
    }

    #[test]
    fn test_wait_for_key_is_cancellable() {
        let mut chip8 = Chip8::new();
        chip8.state.register_needing_key = Some(0x1);
        let (sender, events) = mpsc::channel::<u8>();
        drop(sender);
        assert!(matches!(
            chip8.wait_for_key(&events),
            Err(Chip8Error::KeyWaitCancelled)
        ));
        assert_eq!(chip8.state.register_needing_key, Some(0x1));
    }

    #[test]
    fn test_wait_for_key_returns_when_not_waiting() {
        let mut chip8 = Chip8::new();
        let (_sender, events) = mpsc::channel::<u8>();
        chip8.wait_for_key(&events).unwrap();
    }

    #[test]
    fn test_take_frame_clears_draw_flag() {
        let mut chip8 = Chip8::new();
        assert!(chip8.take_frame().is_none());
        chip8.load_bytes(&[0x00, 0xE0]).unwrap();
        chip8.step().unwrap();
        assert!(chip8.take_frame().is_some());
        assert!(chip8.take_frame().is_none());
    }

    #[test]
    fn test_reverse_cpu_restores_previous_state() {
        let mut chip8 = Chip8::new();
        chip8.load_bytes(&[0x61, 0x11, 0x62, 0x22]).unwrap();
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.saved_states(), 2);
        chip8.reverse_cpu();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x2], 0x0);
        assert_eq!(chip8.state.v[0x1], 0x11);
        chip8.reverse_cpu();
        chip8.reverse_cpu();
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.v[0x1], 0x0);
    }

    // TODO this test is unnecessarily slow because we can't parameterize MAX_SAVED_STATES
    #[test]
    fn test_chip8_drops_old_saved_states() {
        let mut chip8 = Chip8::new();
        // jump to self forever
        chip8.load_bytes(&[0x12, 0x00]).unwrap();
        for _ in 0..MAX_SAVED_STATES {
            chip8.step().unwrap();
        }
        assert_eq!(MAX_SAVED_STATES, chip8.saved_states());
        chip8.step().unwrap();
        assert_eq!(MAX_SAVED_STATES, chip8.saved_states());
    }

    #[test]
    fn test_reset_keeps_program() {
        let mut chip8 = Chip8::with_seed(7);
        chip8.load_bytes(&[0x61, 0x11]).unwrap();
        chip8.step().unwrap();
        chip8.timers().set_delay(0x9);
        chip8.reset();
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.v[0x1], 0x0);
        assert_eq!(chip8.state.memory[0x200..0x202], [0x61, 0x11]);
        assert_eq!(chip8.timers().delay(), 0x0);
        assert_eq!(chip8.saved_states(), 0);
    }

    #[test]
    fn test_seeded_chip8s_agree() {
        let rom = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF];
        let mut a = Chip8::with_seed(0xC8);
        let mut b = Chip8::with_seed(0xC8);
        a.load_bytes(&rom).unwrap();
        b.load_bytes(&rom).unwrap();
        for _ in 0..3 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.state.v, b.state.v);
    }
}
