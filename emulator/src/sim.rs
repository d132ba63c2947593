//! Virtual-time model of the fan board.
//!
//! Time advances in core cycles from one hardware event to the next: SysTick
//! expiries, tach edges from the simulated fan, coupling glitches and
//! scheduler expiries. Each event runs the matching interrupt body from
//! `tach-core`, and the cooperative poll runs after every event the way the
//! firmware's main loop would.

use tach_core::TachController;
use tach_core::capture::{EdgeCaptureCounter, PulseAccumulator};
use tach_core::config::{SynthConfig, TachConfig};
use tach_core::diag::DiagnosticSink;
use tach_core::duty::DutyCommand;
use tach_core::pin::PinArbiter;
use tach_core::synth::{BurstSynthesizer, DEFAULT_BURST_TABLE};
use tach_core::timebase::Timebase;

use crate::board::{
    PinMode, ScopeStats, SharedHw, SimCarrier, SimEdgeIrq, SimPin, SimScheduler, SimSysTick,
    new_board,
};

pub const CLOCK_HZ: u32 = 16_000_000;

/// Tach pulses per fan revolution.
const PULSES_PER_REV: u64 = 2;

/// Glitch edges injected after each real edge when noise is on.
const GLITCHES_PER_EDGE: u8 = 3;

/// Tach pin reported in the capture banner (GPIOA pin 6).
const TACH_CONFIG: TachConfig = TachConfig::DEFAULT.with_pin(0x5000_0000, 1 << 6);

pub type SimController = TachController<'static, SimPin, SimEdgeIrq, SimCarrier, SimScheduler>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Event {
    Tick,
    SchedulerExpiry,
    FanEdge,
    Glitch,
}

pub struct Simulator {
    hw: SharedHw,
    timebase: Timebase<SimSysTick>,
    pulses: &'static PulseAccumulator,
    controller: SimController,
    duty: &'static DutyCommand,
    fan_rpm: u32,
    next_fan_edge: Option<u64>,
    noise: bool,
    next_glitch: Option<u64>,
    glitches_left: u8,
}

impl Simulator {
    pub fn new() -> Self {
        let hw = new_board(CLOCK_HZ);
        // Both live for the rest of the process, matching the firmware statics.
        let pulses: &'static PulseAccumulator = Box::leak(Box::new(PulseAccumulator::new()));
        let duty: &'static DutyCommand = Box::leak(Box::new(DutyCommand::default()));

        let timebase = Timebase::new(SimSysTick(hw.clone()));
        timebase.init(CLOCK_HZ);

        let arbiter = PinArbiter::new(SimPin(hw.clone()), SimEdgeIrq(hw.clone()), pulses);
        let capture = EdgeCaptureCounter::new(TACH_CONFIG, pulses);
        let synth = BurstSynthesizer::new(
            SimCarrier(hw.clone()),
            SimScheduler(hw.clone()),
            SynthConfig::DEFAULT,
            DEFAULT_BURST_TABLE,
        );
        let mut controller = TachController::new(arbiter, capture, synth);
        controller.init(timebase.clock_hz());

        Self {
            hw,
            timebase,
            pulses,
            controller,
            duty,
            fan_rpm: 0,
            next_fan_edge: None,
            noise: false,
            next_glitch: None,
            glitches_left: 0,
        }
    }

    pub fn millis(&self) -> u32 {
        self.timebase.millis()
    }

    pub fn controller_mut(&mut self) -> &mut SimController {
        &mut self.controller
    }

    pub fn duty(&self) -> &'static DutyCommand {
        self.duty
    }

    #[cfg(test)]
    pub fn pulses(&self) -> &'static PulseAccumulator {
        self.pulses
    }

    pub fn fan_rpm(&self) -> u32 {
        self.fan_rpm
    }

    /// Sets the simulated fan speed; zero stops the tach signal.
    pub fn set_fan_rpm(&mut self, rpm: u32) {
        self.fan_rpm = rpm;
        let now = self.hw.borrow().now;
        // Half a period of phase keeps edges off the millisecond grid.
        self.next_fan_edge = self.fan_period().map(|period| now + period / 2);
    }

    pub fn set_noise(&mut self, enabled: bool) {
        self.noise = enabled;
        if !enabled {
            self.next_glitch = None;
            self.glitches_left = 0;
        }
    }

    pub fn noise(&self) -> bool {
        self.noise
    }

    /// Burst measurements since the previous call.
    pub fn take_scope(&mut self) -> ScopeStats {
        let mut hw = self.hw.borrow_mut();
        let stats = hw.scope;
        hw.scope.bursts = 0;
        stats
    }

    /// Advances virtual time by `ms`, running interrupts and the poll loop.
    pub fn run_for<S: DiagnosticSink + ?Sized>(&mut self, ms: u32, sink: &mut S) {
        let cycles_per_ms = u64::from(self.timebase.reload());
        let end = self.hw.borrow().now + u64::from(ms) * cycles_per_ms;

        loop {
            self.service_latched();
            self.controller.poll(self.timebase.millis(), sink);

            let Some((at, event)) = self.next_event(end) else {
                self.hw.borrow_mut().now = end;
                break;
            };
            self.hw.borrow_mut().now = at;
            self.dispatch(event, at);
        }
    }

    /// Cycles between tach edges, at least one so events always advance time.
    fn fan_period(&self) -> Option<u64> {
        (self.fan_rpm > 0).then(|| {
            (u64::from(CLOCK_HZ) * 60 / (u64::from(self.fan_rpm) * PULSES_PER_REV)).max(1)
        })
    }

    fn glitch_spacing() -> u64 {
        u64::from(CLOCK_HZ / SynthConfig::DEFAULT.carrier_hz)
    }

    fn next_event(&self, end: u64) -> Option<(u64, Event)> {
        let hw = self.hw.borrow();
        let reload = u64::from(hw.systick_reload.max(1));
        let tick = (hw.now / reload + 1) * reload;

        [
            Some((tick, Event::Tick)),
            hw.sched_deadline.map(|at| (at, Event::SchedulerExpiry)),
            self.next_fan_edge.map(|at| (at, Event::FanEdge)),
            self.next_glitch.map(|at| (at, Event::Glitch)),
        ]
        .into_iter()
        .flatten()
        .filter(|(at, _)| *at <= end)
        .min_by_key(|(at, _)| *at)
    }

    fn dispatch(&mut self, event: Event, at: u64) {
        match event {
            Event::Tick => self.timebase.on_tick(),
            Event::SchedulerExpiry => {
                let masked = {
                    let mut hw = self.hw.borrow_mut();
                    hw.sched_deadline = None;
                    hw.sched_pending = hw.sched_masked;
                    hw.sched_masked
                };
                if !masked {
                    self.controller.on_scheduler_timeout(self.duty.percent());
                }
            }
            Event::FanEdge => {
                self.next_fan_edge = self.fan_period().map(|period| at + period);
                if self.noise {
                    self.glitches_left = GLITCHES_PER_EDGE;
                    self.next_glitch = Some(at + Self::glitch_spacing());
                }
                self.falling_edge();
            }
            Event::Glitch => {
                self.glitches_left = self.glitches_left.saturating_sub(1);
                self.next_glitch =
                    (self.glitches_left > 0).then(|| at + Self::glitch_spacing());
                self.falling_edge();
            }
        }
    }

    /// Edge interrupt, or a latched request while the line is masked.
    fn falling_edge(&mut self) {
        let deliver = {
            let mut hw = self.hw.borrow_mut();
            if hw.pin != PinMode::CaptureInput {
                return;
            }
            hw.edge_pending = hw.edge_masked;
            !hw.edge_masked
        };
        if deliver {
            self.pulses.record_edge(self.timebase.cycles32());
        }
    }

    /// Runs interrupts that were latched while masked and are now allowed.
    fn service_latched(&mut self) {
        let (edge, sched) = {
            let mut hw = self.hw.borrow_mut();
            let edge = hw.edge_pending && !hw.edge_masked && hw.pin == PinMode::CaptureInput;
            let sched = hw.sched_pending && !hw.sched_masked;
            if edge {
                hw.edge_pending = false;
            }
            (edge, sched)
        };
        if edge {
            self.pulses.record_edge(self.timebase.cycles32());
        }
        if sched {
            self.controller.on_scheduler_timeout(self.duty.percent());
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Vec<String>);

    impl DiagnosticSink for Lines {
        fn emit(&mut self, line: &str) {
            self.0.push(line.to_owned());
        }
    }

    #[test]
    fn fan_speed_is_recovered_from_tach_edges() {
        let mut sim = Simulator::new();
        let mut lines = Lines::default();
        sim.set_fan_rpm(1_200);
        let now = sim.millis();
        sim.controller_mut().reporting_enable(true, now, &mut lines);

        sim.run_for(500, &mut lines);

        assert_eq!(lines.0.len(), 2);
        assert_eq!(lines.0[1], "TACH pulses=20 rejects=0 rpm=1200");
    }

    #[test]
    fn coupling_glitches_are_rejected() {
        let mut sim = Simulator::new();
        let mut lines = Lines::default();
        sim.set_fan_rpm(1_200);
        sim.set_noise(true);
        let now = sim.millis();
        sim.controller_mut().reporting_enable(true, now, &mut lines);

        sim.run_for(500, &mut lines);

        assert_eq!(lines.0[1], "TACH pulses=20 rejects=60 rpm=1200");
    }

    #[test]
    fn synthesized_bursts_follow_the_table() {
        let mut sim = Simulator::new();
        let mut lines = Lines::default();
        sim.controller_mut().synth_enable(true);

        sim.run_for(20, &mut lines);
        let scope = sim.take_scope();

        assert!(scope.bursts >= 10);
        assert_eq!(scope.last_pulses, 35);
        assert_eq!(scope.last_tail_us, 96);
        assert!(lines.0.is_empty());
    }

    #[test]
    fn tach_edges_are_ignored_while_synthesizing() {
        let mut sim = Simulator::new();
        let mut lines = Lines::default();
        sim.set_fan_rpm(3_000);
        sim.controller_mut().synth_enable(true);

        sim.run_for(100, &mut lines);

        assert_eq!(sim.pulses().peek().accepted, 0);
    }

    #[test]
    fn fan_faster_than_the_clock_still_advances_time() {
        let mut sim = Simulator::new();
        let mut lines = Lines::default();
        sim.set_fan_rpm(500_000_000);

        sim.run_for(2, &mut lines);

        assert_eq!(sim.millis(), 2);
        let counts = sim.pulses().peek();
        assert!(counts.accepted + counts.rejected > 1_000);
        assert!(counts.rejected > counts.accepted);
    }
}
