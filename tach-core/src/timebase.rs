//! Millisecond and cycle timebase built on a periodic countdown timer.
//!
//! The countdown timer reloads every millisecond and raises an interrupt; the
//! interrupt handler calls [`Timebase::on_tick`]. Between ticks the remaining
//! countdown value gives sub-millisecond resolution, which [`Timebase::cycles32`]
//! folds into a wrapping 32-bit cycle counter.

use portable_atomic::{AtomicU32, Ordering};

/// Hardware countdown timer driving the timebase (SysTick on Cortex-M).
pub trait Countdown {
    /// Programs a periodic countdown of `reload` cycles with its interrupt enabled.
    fn start_periodic(&self, reload: u32);

    /// Current countdown value, counting down from `reload - 1` to zero.
    fn remaining(&self) -> u32;
}

/// Free-running millisecond counter plus derived cycle counter.
pub struct Timebase<C> {
    countdown: C,
    ms_ticks: AtomicU32,
    reload: AtomicU32,
    clock_hz: AtomicU32,
}

impl<C: Countdown> Timebase<C> {
    /// Creates an idle timebase; call [`Timebase::init`] before use.
    #[must_use]
    pub const fn new(countdown: C) -> Self {
        Self {
            countdown,
            ms_ticks: AtomicU32::new(0),
            reload: AtomicU32::new(1),
            clock_hz: AtomicU32::new(0),
        }
    }

    /// Starts the 1 ms tick for a core clocked at `clock_hz`.
    pub fn init(&self, clock_hz: u32) {
        let reload = (clock_hz / 1_000).max(1);
        self.ms_ticks.store(0, Ordering::Relaxed);
        self.reload.store(reload, Ordering::Relaxed);
        self.clock_hz.store(clock_hz, Ordering::Relaxed);
        self.countdown.start_periodic(reload);
    }

    /// Tick interrupt body. Must be called exactly once per countdown period.
    pub fn on_tick(&self) {
        let next = self.ms_ticks.load(Ordering::Relaxed).wrapping_add(1);
        self.ms_ticks.store(next, Ordering::Release);
    }

    /// Milliseconds since [`Timebase::init`], wrapping at `u32::MAX`.
    #[must_use]
    pub fn millis(&self) -> u32 {
        self.ms_ticks.load(Ordering::Acquire)
    }

    /// Cycles per millisecond tick.
    #[must_use]
    pub fn reload(&self) -> u32 {
        self.reload.load(Ordering::Relaxed)
    }

    /// Core clock captured at init.
    #[must_use]
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz.load(Ordering::Relaxed)
    }

    /// Wrapping cycle counter; only short deltas between two reads are meaningful.
    ///
    /// The tick count is sampled on both sides of the countdown read and the
    /// pair is retried when a tick lands in between.
    #[must_use]
    pub fn cycles32(&self) -> u32 {
        let reload = self.reload();
        loop {
            let before = self.ms_ticks.load(Ordering::Acquire);
            let remaining = self.countdown.remaining();
            let after = self.ms_ticks.load(Ordering::Acquire);
            if before == after {
                return compose_cycles(before, reload, remaining);
            }
        }
    }
}

/// `ticks * reload + (reload - remaining)`, wrapping.
#[must_use]
pub const fn compose_cycles(ticks: u32, reload: u32, remaining: u32) -> u32 {
    ticks
        .wrapping_mul(reload)
        .wrapping_add(reload.wrapping_sub(remaining))
}

/// Converts microseconds to core cycles the way the capture filter does:
/// whole cycles-per-microsecond times `micros`, never less than one cycle.
#[must_use]
pub const fn micros_to_cycles(clock_hz: u32, micros: u32) -> u32 {
    let cycles = (clock_hz / 1_000_000).saturating_mul(micros);
    if cycles == 0 { 1 } else { cycles }
}
