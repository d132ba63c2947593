//! Falling-edge tach capture with glitch rejection.
//!
//! The edge interrupt feeds [`PulseAccumulator::record_edge`] with a cycle
//! timestamp. Edges that follow the last accepted edge by less than the
//! configured spacing are counted as rejects; this is what keeps capacitive
//! pickup from the ~20 kHz fan PWM out of the pulse count. The cooperative
//! main loop calls [`EdgeCaptureCounter::task`], which closes a reporting
//! window every `report_period_ms` and turns the pulse count into RPM.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::TachConfig;
use crate::diag::{CaptureBanner, DiagnosticSink, TachReport, render};
use crate::irq::{IrqLine, MaskedSection};
use crate::pin::{PinArbiter, PinBusy, PinRole, TachPin};
use crate::timebase::micros_to_cycles;

/// Classification of a single edge by the glitch filter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EdgeVerdict {
    Accepted,
    Rejected,
}

/// Pulse and reject counts for one reporting window.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PulseCounts {
    pub accepted: u32,
    pub rejected: u32,
}

/// Counters shared between the edge interrupt and the main loop.
///
/// Only the edge interrupt increments the counts. Everything else reads or
/// clears them with the edge interrupt masked, which is why the increments can
/// be plain load/store pairs.
pub struct PulseAccumulator {
    accepted: AtomicU32,
    rejected: AtomicU32,
    last_edge: AtomicU32,
    has_edge: AtomicBool,
    min_edge_cycles: AtomicU32,
}

impl PulseAccumulator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accepted: AtomicU32::new(0),
            rejected: AtomicU32::new(0),
            last_edge: AtomicU32::new(0),
            has_edge: AtomicBool::new(false),
            min_edge_cycles: AtomicU32::new(1),
        }
    }

    /// Sets the minimum spacing between accepted edges, in cycles.
    pub fn set_min_edge_cycles(&self, cycles: u32) {
        self.min_edge_cycles.store(cycles.max(1), Ordering::Relaxed);
    }

    #[must_use]
    pub fn min_edge_cycles(&self) -> u32 {
        self.min_edge_cycles.load(Ordering::Relaxed)
    }

    /// Edge interrupt body: applies the glitch filter to an edge seen at `now`.
    ///
    /// The first edge after a reset only establishes the baseline and is
    /// always accepted.
    pub fn record_edge(&self, now: u32) -> EdgeVerdict {
        if self.has_edge.load(Ordering::Relaxed) {
            let delta = now.wrapping_sub(self.last_edge.load(Ordering::Relaxed));
            if delta < self.min_edge_cycles() {
                bump(&self.rejected);
                return EdgeVerdict::Rejected;
            }
        }

        self.last_edge.store(now, Ordering::Relaxed);
        self.has_edge.store(true, Ordering::Relaxed);
        bump(&self.accepted);
        EdgeVerdict::Accepted
    }

    /// Current counts without clearing them.
    #[must_use]
    pub fn peek(&self) -> PulseCounts {
        PulseCounts {
            accepted: self.accepted.load(Ordering::Acquire),
            rejected: self.rejected.load(Ordering::Acquire),
        }
    }

    /// Snapshots and zeroes both counts. The guard proves the edge interrupt
    /// is masked for the whole read-then-clear sequence.
    pub fn take<L: IrqLine>(&self, _section: &MaskedSection<'_, L>) -> PulseCounts {
        let counts = self.peek();
        self.accepted.store(0, Ordering::Release);
        self.rejected.store(0, Ordering::Release);
        counts
    }

    /// Clears counts and the edge baseline. Callers hold the edge interrupt masked.
    pub fn reset(&self) {
        self.accepted.store(0, Ordering::Release);
        self.rejected.store(0, Ordering::Release);
        self.last_edge.store(0, Ordering::Release);
        self.has_edge.store(false, Ordering::Release);
    }
}

impl Default for PulseAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counter: &AtomicU32) {
    let next = counter.load(Ordering::Relaxed).wrapping_add(1);
    counter.store(next, Ordering::Release);
}

/// `true` once `now` has reached `deadline` on a wrapping millisecond clock.
#[must_use]
pub const fn deadline_reached(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) < 0x8000_0000
}

/// Reporting side of the tach capture.
pub struct EdgeCaptureCounter<'a> {
    config: TachConfig,
    pulses: &'a PulseAccumulator,
    reporting: bool,
    next_report_ms: u32,
}

impl<'a> EdgeCaptureCounter<'a> {
    #[must_use]
    pub const fn new(config: TachConfig, pulses: &'a PulseAccumulator) -> Self {
        Self {
            config,
            pulses,
            reporting: false,
            next_report_ms: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TachConfig {
        &self.config
    }

    /// Arms capture: pull-up input, falling-edge interrupt, counters cleared,
    /// reporting off.
    pub fn init<P: TachPin, E: IrqLine>(&mut self, arbiter: &mut PinArbiter<'_, P, E>, clock_hz: u32) {
        self.pulses
            .set_min_edge_cycles(micros_to_cycles(clock_hz, self.config.min_edge_us));
        {
            let _masked = MaskedSection::enter(arbiter.edge_irq_mut());
            self.pulses.reset();
        }
        self.reporting = false;
        self.next_report_ms = 0;
        arbiter.assign(PinRole::Capture);
    }

    /// Arms or masks edge capture. Refuses to arm while the synthesizer owns
    /// the pin; the counts are left alone either way.
    pub fn set_capture_enabled<P: TachPin, E: IrqLine>(
        &mut self,
        arbiter: &mut PinArbiter<'_, P, E>,
        enabled: bool,
    ) -> Result<(), PinBusy> {
        match (enabled, arbiter.role()) {
            (true, PinRole::Synth) => Err(PinBusy {
                owner: PinRole::Synth,
            }),
            (true, _) => {
                arbiter.assign(PinRole::Capture);
                Ok(())
            }
            (false, PinRole::Capture) => {
                arbiter.assign(PinRole::Unowned);
                Ok(())
            }
            (false, _) => Ok(()),
        }
    }

    /// Starts or stops periodic reports.
    ///
    /// Enabling emits the configuration banner and schedules the first report
    /// one period from `now_ms`. Disabling zeroes the counts so the next
    /// enable starts from a clean window.
    pub fn set_reporting_enabled<P, E, S>(
        &mut self,
        arbiter: &mut PinArbiter<'_, P, E>,
        enabled: bool,
        now_ms: u32,
        sink: &mut S,
    ) where
        P: TachPin,
        E: IrqLine,
        S: DiagnosticSink + ?Sized,
    {
        self.reporting = enabled;
        self.next_report_ms = now_ms.wrapping_add(self.config.report_period_ms);

        if enabled {
            let banner = CaptureBanner {
                gpio_base: self.config.gpio_base,
                pin_mask: self.config.pin_mask,
            };
            sink.emit(&render(&banner));
        } else {
            let _masked = MaskedSection::enter(arbiter.edge_irq_mut());
            self.pulses.reset();
        }
    }

    #[must_use]
    pub fn is_reporting_enabled(&self) -> bool {
        self.reporting
    }

    /// Absolute deadline of the next report.
    #[must_use]
    pub fn next_report_ms(&self) -> u32 {
        self.next_report_ms
    }

    /// Main-loop hook. Closes the current window once its deadline passes.
    ///
    /// The deadline advances by exactly one period so the cadence does not
    /// drift with main-loop latency.
    pub fn task<L: IrqLine>(&mut self, edge_irq: &mut L, now_ms: u32) -> Option<TachReport> {
        if !self.reporting || !deadline_reached(now_ms, self.next_report_ms) {
            return None;
        }

        self.next_report_ms = self
            .next_report_ms
            .wrapping_add(self.config.report_period_ms);

        let counts = {
            let section = MaskedSection::enter(edge_irq);
            self.pulses.take(&section)
        };

        Some(TachReport {
            pulses: counts.accepted,
            rejects: counts.rejected,
            rpm: counts.accepted.wrapping_mul(self.config.rpm_per_pulse),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOCK_HZ: u32 = 16_000_000;

    fn at_us(micros: u32) -> u32 {
        micros * (CLOCK_HZ / 1_000_000)
    }

    fn accumulator() -> PulseAccumulator {
        let pulses = PulseAccumulator::new();
        pulses.set_min_edge_cycles(micros_to_cycles(CLOCK_HZ, 200));
        pulses
    }

    #[test]
    fn glitch_filter_measures_from_last_accepted_edge() {
        let pulses = accumulator();
        let verdicts = [0, 50, 260, 300, 500].map(|t| pulses.record_edge(at_us(t)));

        assert_eq!(
            verdicts,
            [
                EdgeVerdict::Accepted,
                EdgeVerdict::Rejected,
                EdgeVerdict::Accepted,
                EdgeVerdict::Rejected,
                EdgeVerdict::Accepted,
            ]
        );
        assert_eq!(
            pulses.peek(),
            PulseCounts {
                accepted: 3,
                rejected: 2
            }
        );
    }

    #[test]
    fn filter_handles_cycle_counter_wrap() {
        let pulses = accumulator();
        let start = u32::MAX - at_us(100);
        assert_eq!(pulses.record_edge(start), EdgeVerdict::Accepted);
        assert_eq!(
            pulses.record_edge(start.wrapping_add(at_us(150))),
            EdgeVerdict::Rejected
        );
        assert_eq!(
            pulses.record_edge(start.wrapping_add(at_us(250))),
            EdgeVerdict::Accepted
        );
    }

    #[test]
    fn reset_drops_the_baseline() {
        let pulses = accumulator();
        pulses.record_edge(at_us(1_000));
        pulses.reset();
        assert_eq!(pulses.record_edge(at_us(1_010)), EdgeVerdict::Accepted);
        assert_eq!(pulses.peek().rejected, 0);
    }

    #[test]
    fn deadline_comparison_survives_wrap() {
        assert!(deadline_reached(500, 500));
        assert!(!deadline_reached(499, 500));
        assert!(deadline_reached(10, u32::MAX - 5));
        assert!(!deadline_reached(u32::MAX - 5, 10));
    }
}
