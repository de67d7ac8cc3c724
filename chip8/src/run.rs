use std::fs::File;
use std::io::BufReader;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use log::{info, warn};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use chipvm::{Chip8, Step, TimerTicker};
use display::Display;

use crate::keymap::keymap;
use crate::Args;

/// How long to block on the event queue while an Fx0A instruction waits for a key
const KEY_WAIT_TIMEOUT_MS: u32 = 100;

pub fn run(args: Args) -> anyhow::Result<()> {
    if args.clock_hz == 0 {
        return Err(anyhow!("--clock-hz must be at least 1"));
    }

    let mut chip8 = match args.seed {
        Some(seed) => Chip8::with_seed(seed),
        None => Chip8::new(),
    };

    // Load ROM
    let file = File::open(&args.rom)
        .with_context(|| format!("unable to open {}", args.rom.display()))?;
    let mut reader = BufReader::new(file);
    let size = chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", args.rom.display()))?;
    info!("successfully loaded {} byte ROM", size);

    // Get SDL2 context
    let sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let mut display = Display::new(&sdl, args.scale).map_err(anyhow::Error::msg)?;
    let mut events = sdl.event_pump().map_err(anyhow::Error::msg)?;

    let mut ticker = TimerTicker::start(chip8.timers());

    // Set initial timing
    let cycle_time = Duration::from_nanos(1_000_000_000 / args.clock_hz);
    let mut last_cycle = Instant::now();

    // Whether or not the clock speed should be respected
    let mut fast_forward = false;
    // Whether the game's state should be cycled forwards or backwards
    let mut rewind = false;
    // Whether the CPU is parked on an Fx0A instruction
    let mut awaiting_key = false;

    let result = 'event: loop {
        // If the draw flag is set, unset it and render the current frame
        if let Some(frame) = chip8.take_frame() {
            if let Err(e) = display.render(&frame) {
                break 'event Err(anyhow::Error::msg(e));
            }
        }

        // Handle input, sleeping on the event queue rather than spinning while waiting for a key
        let first = if awaiting_key && !rewind {
            events.wait_event_timeout(KEY_WAIT_TIMEOUT_MS)
        } else {
            None
        };
        let pending: Vec<Event> = first.into_iter().chain(events.poll_iter()).collect();
        for event in pending {
            match event {
                Event::Quit { .. } => break 'event Ok(()),
                Event::KeyDown {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => {
                        if let Err(e) = chip8.key_press(kc) {
                            break 'event Err(e.into());
                        }
                    }
                    (Keycode::Space, _) => fast_forward = true,
                    (Keycode::Escape, _) => rewind = true,
                    _ => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => {
                        if let Err(e) = chip8.key_release(kc) {
                            break 'event Err(e.into());
                        }
                    }
                    (Keycode::Space, _) => fast_forward = false,
                    (Keycode::Escape, _) => rewind = false,
                    _ => continue,
                },
                _ => continue,
            };
        }

        // Update state
        if rewind {
            chip8.reverse_cpu();
            awaiting_key = false;
        } else {
            match chip8.step() {
                Ok(Step::Executed) => awaiting_key = false,
                Ok(Step::AwaitingKey { .. }) => awaiting_key = true,
                Err(e) => break 'event Err(e.into()),
            }
        }

        // Handle timing
        let current_time = Instant::now();
        let elapsed_cycle_time = current_time - last_cycle;
        if !fast_forward && !awaiting_key && cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    };

    ticker.stop();
    if let Err(e) = &result {
        warn!("stopped: {:#}", e);
    }
    result
}
