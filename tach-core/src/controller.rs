//! Facade tying capture, synthesis and pin ownership together.
//!
//! Console handlers, the cooperative poll loop and the scheduler interrupt all
//! go through [`TachController`], which keeps the two pin users mutually
//! exclusive: turning the synthesizer on takes the pin away from capture, and
//! turning capture on stops the synthesizer first.

use crate::capture::{EdgeCaptureCounter, PulseCounts};
use crate::diag::{DiagnosticSink, TachReport, render};
use crate::irq::IrqLine;
use crate::pin::{PinArbiter, PinBusy, PinRole, TachPin};
use crate::synth::{BurstState, BurstSynthesizer, CarrierTimer, OneShotTimer};

/// Point-in-time view of the tach subsystem for `STATUS`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TachStatus {
    pub pin_owner: PinRole,
    pub capture_enabled: bool,
    pub reporting_enabled: bool,
    pub synth_enabled: bool,
    pub burst: BurstState,
    pub bursts_started: u32,
    pub pending: PulseCounts,
}

pub struct TachController<'a, P, E, C, S> {
    arbiter: PinArbiter<'a, P, E>,
    capture: EdgeCaptureCounter<'a>,
    synth: BurstSynthesizer<C, S>,
}

impl<'a, P, E, C, S> TachController<'a, P, E, C, S>
where
    P: TachPin,
    E: IrqLine,
    C: CarrierTimer,
    S: OneShotTimer,
{
    pub fn new(
        arbiter: PinArbiter<'a, P, E>,
        capture: EdgeCaptureCounter<'a>,
        synth: BurstSynthesizer<C, S>,
    ) -> Self {
        Self {
            arbiter,
            capture,
            synth,
        }
    }

    /// Brings up both components. Capture owns the pin afterwards, the
    /// synthesizer is idle and reporting is off.
    pub fn init(&mut self, clock_hz: u32) {
        self.synth.init(clock_hz);
        self.capture.init(&mut self.arbiter, clock_hz);
    }

    /// Arms or masks edge capture. Arming stops the synthesizer first.
    pub fn capture_enable(&mut self, enabled: bool) -> Result<(), PinBusy> {
        if enabled && self.synth.is_enabled() {
            self.synth.set_enabled(false, &mut self.arbiter);
        }
        self.capture.set_capture_enabled(&mut self.arbiter, enabled)
    }

    pub fn reporting_enable<K: DiagnosticSink + ?Sized>(
        &mut self,
        enabled: bool,
        now_ms: u32,
        sink: &mut K,
    ) {
        self.capture
            .set_reporting_enabled(&mut self.arbiter, enabled, now_ms, sink);
    }

    /// Starts or stops the synthesizer. Stopping it hands the pin back to
    /// capture with fresh counters.
    pub fn synth_enable(&mut self, enabled: bool) {
        self.synth.set_enabled(enabled, &mut self.arbiter);
    }

    #[must_use]
    pub fn is_capture_enabled(&self) -> bool {
        self.arbiter.role() == PinRole::Capture
    }

    #[must_use]
    pub fn is_reporting_enabled(&self) -> bool {
        self.capture.is_reporting_enabled()
    }

    #[must_use]
    pub fn is_synth_enabled(&self) -> bool {
        self.synth.is_enabled()
    }

    /// Cooperative-loop hook: emits a report line when a window closes.
    pub fn poll<K: DiagnosticSink + ?Sized>(
        &mut self,
        now_ms: u32,
        sink: &mut K,
    ) -> Option<TachReport> {
        let report = self.capture.task(self.arbiter.edge_irq_mut(), now_ms)?;
        sink.emit(&render(&report));
        Some(report)
    }

    /// Scheduler interrupt body; `duty` is the currently commanded percentage.
    pub fn on_scheduler_timeout(&mut self, duty: u8) {
        self.synth.on_timeout(duty, &mut self.arbiter);
    }

    #[must_use]
    pub fn status(&self) -> TachStatus {
        TachStatus {
            pin_owner: self.arbiter.role(),
            capture_enabled: self.is_capture_enabled(),
            reporting_enabled: self.is_reporting_enabled(),
            synth_enabled: self.is_synth_enabled(),
            burst: self.synth.state(),
            bursts_started: self.synth.bursts_started(),
            pending: self.arbiter.pulses().peek(),
        }
    }

    #[must_use]
    pub fn capture(&self) -> &EdgeCaptureCounter<'a> {
        &self.capture
    }

    #[must_use]
    pub fn synth(&self) -> &BurstSynthesizer<C, S> {
        &self.synth
    }

    #[must_use]
    pub fn arbiter(&self) -> &PinArbiter<'a, P, E> {
        &self.arbiter
    }
}
