use rand::Rng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FLAG_REGISTER, FONT_BASE, FONT_GLYPH_SIZE, MEMORY_SIZE,
};
use crate::error::{Chip8Error, Result};
use crate::keypad::Keypad;
use crate::opcode::Opcode;
use crate::state::State;

/// clear
pub fn clr(_op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.clear_screen();
    Ok(())
}

/// PC = STACK.pop()
pub fn rts(_op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.ret()
}

/// PC = addr
pub fn jump(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.jump(op.addr())
}

/// STACK.push(PC + 2); PC = addr
pub fn call(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.call(op.addr())
}

/// if Vx == kk then pc += 2
pub fn ske(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.skip_if(state.v[op.x()] == op.kk())
}

/// if Vx != kk then pc += 2
pub fn skne(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.skip_if(state.v[op.x()] != op.kk())
}

/// if Vx == Vy then pc += 2
pub fn skre(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.skip_if(state.v[op.x()] == state.v[op.y()])
}

/// Vx = kk
pub fn load(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] = op.kk();
    Ok(())
}

/// Vx += kk
/// Add kk to Vx; allow for overflow but implicitly drop it. VF is untouched.
pub fn add(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] = state.v[op.x()].wrapping_add(op.kk());
    Ok(())
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] = state.v[op.y()];
    Ok(())
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] |= state.v[op.y()];
    Ok(())
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] &= state.v[op.y()];
    Ok(())
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] ^= state.v[op.y()];
    Ok(())
}

/// Writes an arithmetic result to Vx and then its flag to VF, so VF wins when x is F
fn set_with_flag(state: &mut State, x: usize, (res, flag): (u8, bool)) {
    state.v[x] = res;
    state.v[FLAG_REGISTER] = u8::from(flag);
}

/// Returns (a + b) mod 256 and whether the true sum exceeded 255
pub fn add_with_carry(a: u8, b: u8) -> (u8, bool) {
    let sum = u16::from(a) + u16::from(b);
    ((sum & 0xFF) as u8, sum > 0xFF)
}

/// Returns (a - b) mod 256 and NOT borrow, i.e. whether a >= b
pub fn sub_with_borrow(a: u8, b: u8) -> (u8, bool) {
    (a.wrapping_sub(b), a >= b)
}

/// Vx += Vy; VF = carry
pub fn addr(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    let res = add_with_carry(state.v[op.x()], state.v[op.y()]);
    set_with_flag(state, op.x(), res);
    Ok(())
}

/// Vx -= Vy; VF = !borrow
pub fn sub(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    let res = sub_with_borrow(state.v[op.x()], state.v[op.y()]);
    set_with_flag(state, op.x(), res);
    Ok(())
}

/// Vx >>= 1; VF = the bit shifted out
pub fn shr(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    let vx = state.v[op.x()];
    set_with_flag(state, op.x(), (vx >> 1, vx & 0x01 != 0));
    Ok(())
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    let res = sub_with_borrow(state.v[op.y()], state.v[op.x()]);
    set_with_flag(state, op.x(), res);
    Ok(())
}

/// Vx <<= 1; VF = the bit shifted out
pub fn shl(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    let vx = state.v[op.x()];
    set_with_flag(state, op.x(), (vx << 1, vx & 0x80 != 0));
    Ok(())
}

/// if Vx != Vy then pc +=2
pub fn skrne(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.skip_if(state.v[op.x()] != state.v[op.y()])
}

/// I = addr
pub fn loadi(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.i = op.addr();
    Ok(())
}

/// PC = V0 + addr
pub fn jumpi(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.jump(u16::from(state.v[0x0]) + op.addr())
}

/// Vx = rand_byte & kk
pub fn rand(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    let rand_byte: u8 = state.rng.gen();
    state.v[op.x()] = rand_byte & op.kk();
    Ok(())
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n onto the FrameBuffer.
/// The origin wraps around the screen but the sprite itself is clipped at the edges.
/// Sets VF if any pixels are erased
pub fn draw(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    let origin_x = state.v[op.x()] as usize % DISPLAY_WIDTH;
    let origin_y = state.v[op.y()] as usize % DISPLAY_HEIGHT;
    let mut sprite = [0u8; 0xF];
    let rows = op.n() as usize;
    sprite[..rows].copy_from_slice(state.slice(state.i as usize, rows)?);
    state.advance()?;

    let mut collision = 0x0;
    for (row, byte) in sprite[..rows].iter().enumerate() {
        let y = origin_y + row;
        if y >= DISPLAY_HEIGHT {
            break;
        }
        for bit in 0..8 {
            let x = origin_x + bit;
            if x >= DISPLAY_WIDTH {
                break;
            }
            let pixel = (byte >> (7 - bit)) & 0x1;
            collision |= pixel & state.frame_buffer[y][x];
            state.frame_buffer[y][x] ^= pixel;
        }
    }

    state.v[FLAG_REGISTER] = collision;
    state.draw_flag = true;
    Ok(())
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: &dyn Opcode, state: &mut State, keypad: &Keypad) -> Result<()> {
    state.skip_if(keypad.is_pressed(state.v[op.x()]))
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: &dyn Opcode, state: &mut State, keypad: &Keypad) -> Result<()> {
    state.skip_if(!keypad.is_pressed(state.v[op.x()]))
}

/// Vx = DT
pub fn moved(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.v[op.x()] = state.timers.delay();
    Ok(())
}

/// await keypress for Vx
/// The pc stays on this instruction until the key arrives.
pub fn keyd(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.register_needing_key = Some(op.x() as u8);
    Ok(())
}

/// DT = Vx
pub fn loads(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.timers.set_delay(state.v[op.x()]);
    Ok(())
}

/// ST = Vx
pub fn ld(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.timers.set_sound(state.v[op.x()]);
    Ok(())
}

/// I += Vx
pub fn addi(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    let i = state.i as usize + state.v[op.x()] as usize;
    if i >= MEMORY_SIZE {
        return Err(Chip8Error::OutOfBoundsAccess { address: i });
    }
    state.advance()?;
    state.i = i as u16;
    Ok(())
}

/// I = FONT_BASE + Vx * 5
/// Set I to the memory address of the font glyph for the low nibble of Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    state.advance()?;
    state.i = FONT_BASE + u16::from(state.v[op.x()] & 0xF) * FONT_GLYPH_SIZE;
    Ok(())
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    let vx = state.v[op.x()];
    let bcd = [vx / 100 % 10, vx / 10 % 10, vx % 10];
    state.check_writable(state.i as usize, bcd.len())?;
    state.advance()?;
    state.write(state.i as usize, &bcd)
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    let registers = state.v;
    state.check_writable(state.i as usize, op.x() + 1)?;
    state.advance()?;
    state.write(state.i as usize, &registers[..=op.x()])
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(op: &dyn Opcode, state: &mut State, _keypad: &Keypad) -> Result<()> {
    let mut bytes = [0u8; 0x10];
    let count = op.x() + 1;
    bytes[..count].copy_from_slice(state.slice(state.i as usize, count)?);
    state.advance()?;
    state.v[..count].copy_from_slice(&bytes[..count]);
    Ok(())
}
