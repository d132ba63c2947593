//! Tach waveform synthesis.
//!
//! A synthesized tach signal is a train of bursts. Each burst drives the tach
//! pin with `pulses` cycles of a fixed carrier and then holds the line low for
//! `tail_us`. The burst parameters come from [`BurstTable::interpolate`] using
//! the duty commanded at the moment the burst starts. Phases are timed by a
//! one-shot timer whose interrupt calls [`BurstSynthesizer::on_timeout`].

mod table;

pub use table::{BurstPoint, BurstTable, BurstTarget, DEFAULT_BURST_TABLE};

use crate::config::SynthConfig;
use crate::irq::IrqLine;
use crate::pin::{PinArbiter, PinRole, TachPin};

/// PWM timer generating the carrier on the tach pin.
pub trait CarrierTimer {
    /// Sets the carrier period and compare value, in timer ticks. Leaves the
    /// output disabled.
    fn configure(&mut self, period: u32, compare: u32);
    fn enable(&mut self);
    fn disable(&mut self);
}

/// One-shot timer sequencing the burst phases. Its interrupt line is masked
/// and unmasked through [`IrqLine`].
pub trait OneShotTimer: IrqLine {
    /// Puts the timer in one-pulse mode, stopped.
    fn configure_one_shot(&mut self);

    /// Starts a single countdown that expires after `cycles` core cycles.
    fn arm(&mut self, cycles: u32);

    /// Stops the countdown and drops any pending expiry.
    fn disarm(&mut self);

    /// Clears the expiry flag from inside the interrupt handler.
    fn acknowledge(&mut self);
}

/// Synthesizer phase.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BurstState {
    #[default]
    Idle,
    /// Carrier running for `target.pulses` cycles.
    Pulses(BurstTarget),
    /// Line held low for `target.tail_us`.
    Tail(BurstTarget),
}

impl BurstState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BurstState::Idle => "IDLE",
            BurstState::Pulses(_) => "PULSES",
            BurstState::Tail(_) => "TAIL",
        }
    }

    /// Target of the burst in progress, if any.
    #[must_use]
    pub const fn target(self) -> Option<BurstTarget> {
        match self {
            BurstState::Idle => None,
            BurstState::Pulses(target) | BurstState::Tail(target) => Some(target),
        }
    }
}

/// Hardware work implied by a phase transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PhaseAction {
    /// Route the carrier to the pin, start it and arm the scheduler.
    StartPulses { arm_cycles: u32 },
    /// Stop the carrier, hold the pin low and arm the scheduler.
    StartTail { arm_cycles: u32 },
    /// Nothing to do.
    Hold,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PhaseStep {
    pub next: BurstState,
    pub action: PhaseAction,
}

/// Cycle arithmetic for one core clock and carrier.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BurstTiming {
    clock_hz: u32,
    carrier_period: u32,
}

impl BurstTiming {
    #[must_use]
    pub const fn new(clock_hz: u32, config: &SynthConfig) -> Self {
        let period = if config.carrier_hz == 0 {
            config.min_carrier_period
        } else {
            clock_hz / config.carrier_hz
        };
        let carrier_period = if period < config.min_carrier_period {
            config.min_carrier_period
        } else {
            period
        };
        Self {
            clock_hz,
            carrier_period,
        }
    }

    #[must_use]
    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Carrier period in timer ticks.
    #[must_use]
    pub const fn carrier_period(&self) -> u32 {
        self.carrier_period
    }

    /// 50 % compare value.
    #[must_use]
    pub const fn carrier_compare(&self) -> u32 {
        self.carrier_period / 2
    }

    /// Scheduler cycles covering `pulses` carrier periods.
    #[must_use]
    pub const fn pulse_cycles(&self, pulses: u32) -> u32 {
        clamp_cycles(pulses as u64 * self.carrier_period as u64)
    }

    /// Scheduler cycles covering `tail_us` microseconds.
    #[must_use]
    pub const fn tail_cycles(&self, tail_us: u32) -> u32 {
        clamp_cycles(self.clock_hz as u64 * tail_us as u64 / 1_000_000)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn clamp_cycles(cycles: u64) -> u32 {
    if cycles == 0 {
        1
    } else if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}

/// Pure transition function of the burst state machine, evaluated on every
/// scheduler expiry.
///
/// `duty` is only consulted when a new burst starts.
#[must_use]
pub fn next_phase(
    state: BurstState,
    duty: u8,
    table: &BurstTable,
    timing: &BurstTiming,
) -> PhaseStep {
    match state {
        BurstState::Idle => PhaseStep {
            next: BurstState::Idle,
            action: PhaseAction::Hold,
        },
        BurstState::Pulses(target) => PhaseStep {
            next: BurstState::Tail(target),
            action: PhaseAction::StartTail {
                arm_cycles: timing.tail_cycles(target.tail_us),
            },
        },
        BurstState::Tail(_) => {
            let target = table.interpolate(duty);
            PhaseStep {
                next: BurstState::Pulses(target),
                action: PhaseAction::StartPulses {
                    arm_cycles: timing.pulse_cycles(target.pulses),
                },
            }
        }
    }
}

/// Target loaded on enable so the first expiry starts a real burst almost
/// immediately.
const PRIMING_TAIL: BurstTarget = BurstTarget {
    pulses: 0,
    tail_us: 1,
};

/// Burst synthesizer driving the tach pin from the scheduler interrupt.
pub struct BurstSynthesizer<C, S> {
    carrier: C,
    scheduler: S,
    config: SynthConfig,
    table: BurstTable,
    timing: BurstTiming,
    state: BurstState,
    enabled: bool,
    bursts_started: u32,
}

impl<C: CarrierTimer, S: OneShotTimer> BurstSynthesizer<C, S> {
    #[must_use]
    pub fn new(carrier: C, scheduler: S, config: SynthConfig, table: BurstTable) -> Self {
        Self {
            carrier,
            scheduler,
            config,
            timing: BurstTiming::new(0, &config),
            table,
            state: BurstState::Idle,
            enabled: false,
            bursts_started: 0,
        }
    }

    /// Configures the carrier (disabled) and the scheduler (stopped, interrupt
    /// masked) for a core clocked at `clock_hz`.
    pub fn init(&mut self, clock_hz: u32) {
        self.timing = BurstTiming::new(clock_hz, &self.config);

        self.scheduler.mask();
        self.scheduler.disarm();
        self.scheduler.configure_one_shot();

        self.carrier.configure(
            self.timing.carrier_period(),
            self.timing.carrier_compare(),
        );
        self.carrier.disable();

        self.state = BurstState::Idle;
        self.enabled = false;
    }

    /// Starts or stops synthesis. Redundant calls do nothing.
    ///
    /// Stopping masks and disarms the scheduler before anything else, then
    /// stops the carrier, drives the pin low and hands it back to capture.
    pub fn set_enabled<P: TachPin, E: IrqLine>(
        &mut self,
        enabled: bool,
        arbiter: &mut PinArbiter<'_, P, E>,
    ) {
        if enabled == self.enabled {
            return;
        }

        self.scheduler.mask();
        self.scheduler.disarm();

        if enabled {
            arbiter.assign(PinRole::Synth);
            self.state = BurstState::Tail(PRIMING_TAIL);
            self.enabled = true;
            self.scheduler.unmask();
            self.scheduler.arm(1);
        } else {
            self.enabled = false;
            self.state = BurstState::Idle;
            self.carrier.disable();
            if let Some(pin) = arbiter.pin_for(PinRole::Synth) {
                pin.drive_low();
            }
            arbiter.assign(PinRole::Capture);
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn state(&self) -> BurstState {
        self.state
    }

    /// Bursts started since boot, wrapping.
    #[must_use]
    pub fn bursts_started(&self) -> u32 {
        self.bursts_started
    }

    /// Scheduler interrupt body.
    pub fn on_timeout<P: TachPin, E: IrqLine>(
        &mut self,
        duty: u8,
        arbiter: &mut PinArbiter<'_, P, E>,
    ) {
        self.scheduler.acknowledge();
        if !self.enabled {
            return;
        }

        let step = next_phase(self.state, duty, &self.table, &self.timing);
        self.state = step.next;

        match step.action {
            PhaseAction::StartPulses { arm_cycles } => {
                if let Some(pin) = arbiter.pin_for(PinRole::Synth) {
                    pin.into_carrier_output();
                }
                self.carrier.enable();
                self.scheduler.arm(arm_cycles);
                self.bursts_started = self.bursts_started.wrapping_add(1);
            }
            PhaseAction::StartTail { arm_cycles } => {
                self.carrier.disable();
                if let Some(pin) = arbiter.pin_for(PinRole::Synth) {
                    pin.drive_low();
                }
                self.scheduler.arm(arm_cycles);
            }
            PhaseAction::Hold => {}
        }
    }
}
