use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::constants::TIMER_HZ;

#[derive(Debug, Default)]
struct Counters {
    delay: AtomicU8,
    sound: AtomicU8,
}

/// # Timers
/// The delay and sound countdown timers.
///
/// This is the only state shared between the interpreter and the `TimerTicker`.
/// Cloning a `Timers` yields another handle to the same pair of counters.
/// - the interpreter loads and stores the counters
/// - the ticker only ever decrements them, saturating at 0
#[derive(Debug, Clone, Default)]
pub struct Timers {
    counters: Arc<Counters>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> u8 {
        self.counters.delay.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, value: u8) {
        self.counters.delay.store(value, Ordering::SeqCst)
    }

    pub fn sound(&self) -> u8 {
        self.counters.sound.load(Ordering::SeqCst)
    }

    pub fn set_sound(&self, value: u8) {
        self.counters.sound.store(value, Ordering::SeqCst)
    }

    /// Decrement both counters by one without going below zero
    pub fn tick(&self) {
        for counter in [&self.counters.delay, &self.counters.sound] {
            // Err just means the counter was already at 0
            let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
        }
    }
}

/// # Timer Ticker
/// Ticks a set of `Timers` at 60Hz on a background thread until stopped.
///
/// The thread is paced against absolute deadlines so late wakeups don't
/// accumulate drift. The number of ticks never exceeds the number of elapsed periods.
pub struct TimerTicker {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TimerTicker {
    /// Starts ticking `timers` at the standard 60Hz
    pub fn start(timers: Timers) -> Self {
        Self::with_period(timers, Duration::from_nanos(1_000_000_000 / TIMER_HZ))
    }

    /// Starts ticking `timers` once every `period`
    pub fn with_period(timers: Timers, period: Duration) -> Self {
        let (shutdown, signal) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            debug!("timer ticker started with a period of {:?}", period);
            let mut deadline = Instant::now() + period;
            loop {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match signal.recv_timeout(timeout) {
                    Err(RecvTimeoutError::Timeout) => {
                        timers.tick();
                        deadline += period;
                    }
                    // Either an explicit stop or the ticker was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("timer ticker stopped");
        });

        TimerTicker {
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    /// Whether the background thread is still ticking
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signals the background thread to stop and waits for it to exit.
    /// Once this returns no further decrements will happen.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The thread may have already exited, in which case there's nobody to tell
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("timer ticker thread panicked");
            }
        }
    }
}

impl Drop for TimerTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
