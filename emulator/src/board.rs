//! Virtual STM32 peripherals backing the tach traits.
//!
//! All peripherals share one [`Hw`] record behind `Rc<RefCell<_>>`; the
//! simulator advances `now` and the trait adapters read and write the same
//! record, the way register writes would land on the real part.

use std::cell::RefCell;
use std::rc::Rc;

use tach_core::irq::IrqLine;
use tach_core::pin::TachPin;
use tach_core::synth::{CarrierTimer, OneShotTimer};
use tach_core::timebase::Countdown;

/// Pad configuration of the tach pin.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PinMode {
    #[default]
    Low,
    CaptureInput,
    CarrierOutput,
}

/// Burst measurements taken on the tach pin.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ScopeStats {
    pub bursts: u32,
    pub last_pulses: u32,
    pub last_tail_us: u32,
}

#[derive(Debug, Default)]
pub struct Hw {
    pub now: u64,
    pub clock_hz: u32,
    pub systick_reload: u32,
    pub pin: PinMode,
    pub edge_masked: bool,
    pub edge_pending: bool,
    pub carrier_period: u32,
    pub carrier_since: Option<u64>,
    pub carrier_stopped_at: Option<u64>,
    pub sched_masked: bool,
    pub sched_deadline: Option<u64>,
    pub sched_pending: bool,
    pub scope: ScopeStats,
}

impl Hw {
    fn cycles_to_us(&self, cycles: u64) -> u32 {
        let per_us = u64::from((self.clock_hz / 1_000_000).max(1));
        u32::try_from(cycles / per_us).unwrap_or(u32::MAX)
    }
}

pub type SharedHw = Rc<RefCell<Hw>>;

pub fn new_board(clock_hz: u32) -> SharedHw {
    Rc::new(RefCell::new(Hw {
        clock_hz,
        ..Hw::default()
    }))
}

pub struct SimSysTick(pub SharedHw);

impl Countdown for SimSysTick {
    fn start_periodic(&self, reload: u32) {
        self.0.borrow_mut().systick_reload = reload;
    }

    fn remaining(&self) -> u32 {
        let hw = self.0.borrow();
        let reload = u64::from(hw.systick_reload.max(1));
        let elapsed = hw.now % reload;
        u32::try_from(reload - 1 - elapsed).unwrap_or(0)
    }
}

pub struct SimPin(pub SharedHw);

impl TachPin for SimPin {
    fn into_capture_input(&mut self) {
        self.0.borrow_mut().pin = PinMode::CaptureInput;
    }

    fn into_carrier_output(&mut self) {
        self.0.borrow_mut().pin = PinMode::CarrierOutput;
    }

    fn drive_low(&mut self) {
        self.0.borrow_mut().pin = PinMode::Low;
    }
}

pub struct SimEdgeIrq(pub SharedHw);

impl IrqLine for SimEdgeIrq {
    fn mask(&mut self) {
        self.0.borrow_mut().edge_masked = true;
    }

    fn unmask(&mut self) {
        self.0.borrow_mut().edge_masked = false;
    }

    fn clear_pending(&mut self) {
        self.0.borrow_mut().edge_pending = false;
    }

    fn is_masked(&self) -> bool {
        self.0.borrow().edge_masked
    }
}

pub struct SimCarrier(pub SharedHw);

impl CarrierTimer for SimCarrier {
    fn configure(&mut self, period: u32, _compare: u32) {
        self.0.borrow_mut().carrier_period = period;
    }

    fn enable(&mut self) {
        let mut hw = self.0.borrow_mut();
        if hw.carrier_since.is_some() {
            return;
        }
        if let Some(stopped) = hw.carrier_stopped_at.take() {
            let tail = hw.cycles_to_us(hw.now - stopped);
            hw.scope.last_tail_us = tail;
        }
        hw.carrier_since = Some(hw.now);
    }

    fn disable(&mut self) {
        let mut hw = self.0.borrow_mut();
        let Some(since) = hw.carrier_since.take() else {
            return;
        };
        let period = u64::from(hw.carrier_period.max(1));
        let pulses = u32::try_from((hw.now - since) / period).unwrap_or(u32::MAX);
        hw.scope.bursts = hw.scope.bursts.wrapping_add(1);
        hw.scope.last_pulses = pulses;
        hw.carrier_stopped_at = Some(hw.now);
    }
}

pub struct SimScheduler(pub SharedHw);

impl IrqLine for SimScheduler {
    fn mask(&mut self) {
        self.0.borrow_mut().sched_masked = true;
    }

    fn unmask(&mut self) {
        self.0.borrow_mut().sched_masked = false;
    }

    fn clear_pending(&mut self) {
        self.0.borrow_mut().sched_pending = false;
    }

    fn is_masked(&self) -> bool {
        self.0.borrow().sched_masked
    }
}

impl OneShotTimer for SimScheduler {
    fn configure_one_shot(&mut self) {
        let mut hw = self.0.borrow_mut();
        hw.sched_deadline = None;
        hw.sched_pending = false;
    }

    fn arm(&mut self, cycles: u32) {
        let mut hw = self.0.borrow_mut();
        hw.sched_deadline = Some(hw.now + u64::from(cycles.max(1)));
    }

    fn disarm(&mut self) {
        let mut hw = self.0.borrow_mut();
        hw.sched_deadline = None;
        hw.sched_pending = false;
    }

    fn acknowledge(&mut self) {
        self.0.borrow_mut().sched_pending = false;
    }
}
