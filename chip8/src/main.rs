use std::path::PathBuf;

use clap::Parser;

use chipvm::CLOCK_HZ;

mod keymap;
mod run;

/// Runs a Chip-8 ROM in an SDL2 window
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to the ROM to load at 0x200
    pub rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = CLOCK_HZ)]
    pub clock_hz: u64,

    /// Size of each Chip-8 pixel on screen
    #[arg(long, default_value_t = 10)]
    pub scale: usize,

    /// Seed for the random number generator, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    run::run(Args::parse())
}
