use std::thread;
use std::time::{Duration, Instant};

use chipvm::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chipvm::{Chip8, Chip8Error, Step, TimerTicker};

fn chip8_with(rom: &[u8]) -> Chip8 {
    let mut chip8 = Chip8::with_seed(0);
    chip8.load_bytes(rom).unwrap();
    chip8
}

fn blank(chip8: &Chip8) -> bool {
    chip8.frame().iter().all(|row| row.iter().all(|&px| px == 0))
}

#[test]
fn test_clear_then_jump_to_self_runs_forever() {
    let mut chip8 = chip8_with(&[0x00, 0xE0, 0x12, 0x00]);
    for _ in 0..10_000 {
        assert_eq!(chip8.step().unwrap(), Step::Executed);
        assert!(chip8.state().pc() == 0x200 || chip8.state().pc() == 0x202);
    }
    // An even number of steps always lands back on the clear
    assert_eq!(chip8.state().pc(), 0x200);
    assert_eq!(chip8.state().sp(), 0);
    assert!(blank(&chip8));
}

#[test]
fn test_jump_ignores_previous_pc() {
    // 0x200: jump to 0x204; 0x204: jump to 0x228
    let mut chip8 = chip8_with(&[0x12, 0x04, 0x00, 0x00, 0x12, 0x28]);
    chip8.step().unwrap();
    chip8.step().unwrap();
    assert_eq!(chip8.state().pc(), 0x228);
}

#[test]
fn test_call_then_return() {
    // 0x200: call 0x206; 0x202: jump to self; 0x206: return
    let mut chip8 = chip8_with(&[0x22, 0x06, 0x12, 0x02, 0x00, 0x00, 0x00, 0xEE]);
    chip8.step().unwrap();
    assert_eq!(chip8.state().pc(), 0x206);
    assert_eq!(chip8.state().stack(), &[0x202]);
    chip8.step().unwrap();
    assert_eq!(chip8.state().pc(), 0x202);
    assert_eq!(chip8.state().sp(), 0);
}

#[test]
fn test_recursion_overflows_the_stack() {
    // 0x200: call 0x200
    let mut chip8 = chip8_with(&[0x22, 0x00]);
    for depth in 1..=16 {
        chip8.step().unwrap();
        assert_eq!(chip8.state().sp(), depth);
    }
    assert!(matches!(
        chip8.step(),
        Err(Chip8Error::StackOverflow { address: 0x200 })
    ));
    assert_eq!(chip8.state().sp(), 16);
}

#[test]
fn test_running_off_the_end_of_memory() {
    let mut chip8 = Chip8::new();
    // 0x200: jump to 0xFFE, which holds a clear
    let mut rom = vec![0u8; 0xE00];
    rom[..2].copy_from_slice(&[0x1F, 0xFE]);
    rom[0xDFE..].copy_from_slice(&[0x00, 0xE0]);
    chip8.load_bytes(&rom).unwrap();
    chip8.step().unwrap();
    assert_eq!(chip8.state().pc(), 0xFFE);
    assert!(matches!(
        chip8.step(),
        Err(Chip8Error::OutOfBoundsAccess { address: 0x1000 })
    ));
    assert_eq!(chip8.state().pc(), 0xFFE);
}

#[test]
fn test_delay_timer_counts_down_to_zero() {
    // V1 = 5; DT = V1; V2 = DT; V3 = DT
    let mut chip8 = chip8_with(&[0x61, 0x05, 0xF1, 0x15, 0xF2, 0x07, 0xF3, 0x07]);
    chip8.step().unwrap();
    chip8.step().unwrap();
    let timers = chip8.timers();
    for _ in 0..5 {
        timers.tick();
    }
    chip8.step().unwrap();
    assert_eq!(chip8.state().registers()[0x2], 0);
    timers.tick();
    chip8.step().unwrap();
    assert_eq!(chip8.state().registers()[0x3], 0);
}

#[test]
fn test_ticker_drives_timers_in_real_time() {
    // V1 = 3; DT = V1; ST = V1
    let mut chip8 = chip8_with(&[0x61, 0x03, 0xF1, 0x15, 0xF1, 0x18]);
    let mut ticker = TimerTicker::start(chip8.timers());
    for _ in 0..3 {
        chip8.step().unwrap();
    }
    // 3 ticks at 60Hz is 50ms
    thread::sleep(Duration::from_millis(250));
    ticker.stop();
    assert_eq!(chip8.timers().delay(), 0);
    assert_eq!(chip8.timers().sound(), 0);
}

#[test]
fn test_drawing_a_glyph_twice() {
    // V0 = 5; V1 = 3; VA = 8; I = glyph(VA); draw; draw
    let mut chip8 = chip8_with(&[
        0x60, 0x05, 0x61, 0x03, 0x6A, 0x08, 0xFA, 0x29, 0xD0, 0x15, 0xD0, 0x15,
    ]);
    for _ in 0..5 {
        chip8.step().unwrap();
    }
    assert_eq!(chip8.state().registers()[0xF], 0);
    let frame = chip8.take_frame().unwrap();
    // The top row of an 8 is ####
    assert_eq!(frame[3][5..9], [1, 1, 1, 1]);
    assert_eq!(frame.iter().flatten().filter(|&&px| px == 1).count(), 16);

    chip8.step().unwrap();
    assert_eq!(chip8.state().registers()[0xF], 1);
    assert!(blank(&chip8));
}

#[test]
fn test_bcd_then_load() {
    // V0 = 255; I = 0x300; bcd(V0); V0..=V2 = mem[I..]
    let mut chip8 = chip8_with(&[0x60, 0xFF, 0xA3, 0x00, 0xF0, 0x33, 0xF2, 0x65]);
    for _ in 0..4 {
        chip8.step().unwrap();
    }
    assert_eq!(chip8.state().memory()[0x300..0x303], [2, 5, 5]);
    assert_eq!(chip8.state().registers()[..3], [2, 5, 5]);
}

#[test]
fn test_bcd_into_reserved_scratch_memory() {
    // V0 = 255; I = 0x100; bcd(V0)
    let mut chip8 = chip8_with(&[0x60, 0xFF, 0xA1, 0x00, 0xF0, 0x33]);
    for _ in 0..3 {
        chip8.step().unwrap();
    }
    assert_eq!(chip8.state().memory()[0x100..0x103], [2, 5, 5]);
    assert_eq!(chip8.state().pc(), 0x206);
}

#[test]
fn test_bcd_into_font_fails() {
    // V0 = 255; I = 0x050; bcd(V0)
    let mut chip8 = chip8_with(&[0x60, 0xFF, 0xA0, 0x50, 0xF0, 0x33]);
    chip8.step().unwrap();
    chip8.step().unwrap();
    assert!(matches!(
        chip8.step(),
        Err(Chip8Error::ReservedWrite { address: 0x050 })
    ));
    assert_eq!(chip8.state().memory()[0x50..0x53], [0xF0, 0x90, 0x90]);
    assert_eq!(chip8.state().pc(), 0x204);
}

/// The ticker may fall behind but never runs ahead of 60Hz
fn assert_paced(elapsed: Duration, ticks: u8) {
    let allowed = (elapsed.as_secs_f64() * 60.0).floor() as u32 + 1;
    assert!(
        u32::from(ticks) <= allowed,
        "{} ticks in {:?}, at most {} allowed",
        ticks,
        elapsed,
        allowed
    );
}

#[test]
fn test_ticker_never_outpaces_sixty_hertz() {
    // V1 = 255; DT = V1
    let mut chip8 = chip8_with(&[0x61, 0xFF, 0xF1, 0x15]);
    chip8.step().unwrap();
    chip8.step().unwrap();

    let started = Instant::now();
    let mut ticker = TimerTicker::start(chip8.timers());
    for _ in 0..10 {
        thread::sleep(Duration::from_millis(50));
        let ticks = 255 - chip8.timers().delay();
        assert_paced(started.elapsed(), ticks);
    }
    ticker.stop();
    let elapsed = started.elapsed();
    let ticks = 255 - chip8.timers().delay();

    assert_paced(elapsed, ticks);
    // 500ms is 30 ticks; leave plenty of room for a busy machine
    assert!(ticks >= 10, "only {} ticks in {:?}", ticks, elapsed);
}

#[test]
fn test_key_gated_loop() {
    // 0x200: skip if key V0 is pressed; 0x202: jump to 0x200; 0x204: V1 = 1
    let mut chip8 = chip8_with(&[0xE0, 0x9E, 0x12, 0x00, 0x61, 0x01]);
    for _ in 0..10 {
        chip8.step().unwrap();
    }
    assert_eq!(chip8.state().pc(), 0x200);
    chip8.key_press(0x0).unwrap();
    chip8.step().unwrap();
    chip8.step().unwrap();
    assert_eq!(chip8.state().registers()[0x1], 1);
}

#[test]
fn test_frame_dimensions() {
    let chip8 = Chip8::new();
    assert_eq!(chip8.frame().len(), DISPLAY_HEIGHT);
    assert_eq!(chip8.frame()[0].len(), DISPLAY_WIDTH);
}
