#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use tach_core::TachController;
use tach_core::capture::{EdgeCaptureCounter, PulseAccumulator};
use tach_core::config::{SynthConfig, TachConfig};
use tach_core::diag::DiagnosticSink;
use tach_core::irq::IrqLine;
use tach_core::pin::{PinArbiter, TachPin};
use tach_core::synth::{BurstSynthesizer, CarrierTimer, DEFAULT_BURST_TABLE, OneShotTimer};

pub const CLOCK_HZ: u32 = 16_000_000;
pub const CARRIER_PERIOD: u32 = 744;
pub const GPIO_BASE: u32 = 0x5000_0000;
pub const PIN_MASK: u32 = 1 << 6;

/// Every hardware touch made by the fakes, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwEvent {
    EdgeMask,
    EdgeUnmask,
    EdgeClearPending,
    PinCapture,
    PinCarrier,
    PinLow,
    CarrierConfigure { period: u32, compare: u32 },
    CarrierOn,
    CarrierOff,
    SchedMask,
    SchedUnmask,
    SchedConfigure,
    SchedArm(u32),
    SchedDisarm,
    SchedAck,
}

#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<HwEvent>>>);

impl Log {
    pub fn push(&self, event: HwEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn take(&self) -> Vec<HwEvent> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn position(&self, event: HwEvent) -> Option<usize> {
        self.0.borrow().iter().position(|seen| *seen == event)
    }
}

pub struct FakePin(Log);

impl TachPin for FakePin {
    fn into_capture_input(&mut self) {
        self.0.push(HwEvent::PinCapture);
    }

    fn into_carrier_output(&mut self) {
        self.0.push(HwEvent::PinCarrier);
    }

    fn drive_low(&mut self) {
        self.0.push(HwEvent::PinLow);
    }
}

pub struct FakeEdgeIrq {
    log: Log,
    masked: bool,
}

impl IrqLine for FakeEdgeIrq {
    fn mask(&mut self) {
        self.masked = true;
        self.log.push(HwEvent::EdgeMask);
    }

    fn unmask(&mut self) {
        self.masked = false;
        self.log.push(HwEvent::EdgeUnmask);
    }

    fn clear_pending(&mut self) {
        self.log.push(HwEvent::EdgeClearPending);
    }

    fn is_masked(&self) -> bool {
        self.masked
    }
}

pub struct FakeCarrier(Log);

impl CarrierTimer for FakeCarrier {
    fn configure(&mut self, period: u32, compare: u32) {
        self.0.push(HwEvent::CarrierConfigure { period, compare });
    }

    fn enable(&mut self) {
        self.0.push(HwEvent::CarrierOn);
    }

    fn disable(&mut self) {
        self.0.push(HwEvent::CarrierOff);
    }
}

pub struct FakeScheduler {
    log: Log,
    masked: bool,
}

impl IrqLine for FakeScheduler {
    fn mask(&mut self) {
        self.masked = true;
        self.log.push(HwEvent::SchedMask);
    }

    fn unmask(&mut self) {
        self.masked = false;
        self.log.push(HwEvent::SchedUnmask);
    }

    fn clear_pending(&mut self) {}

    fn is_masked(&self) -> bool {
        self.masked
    }
}

impl OneShotTimer for FakeScheduler {
    fn configure_one_shot(&mut self) {
        self.log.push(HwEvent::SchedConfigure);
    }

    fn arm(&mut self, cycles: u32) {
        self.log.push(HwEvent::SchedArm(cycles));
    }

    fn disarm(&mut self) {
        self.log.push(HwEvent::SchedDisarm);
    }

    fn acknowledge(&mut self) {
        self.log.push(HwEvent::SchedAck);
    }
}

pub type FakeArbiter<'a> = PinArbiter<'a, FakePin, FakeEdgeIrq>;
pub type FakeController<'a> = TachController<'a, FakePin, FakeEdgeIrq, FakeCarrier, FakeScheduler>;

pub fn tach_config() -> TachConfig {
    TachConfig::DEFAULT.with_pin(GPIO_BASE, PIN_MASK)
}

pub fn arbiter<'a>(pulses: &'a PulseAccumulator, log: &Log) -> FakeArbiter<'a> {
    PinArbiter::new(
        FakePin(log.clone()),
        FakeEdgeIrq {
            log: log.clone(),
            masked: false,
        },
        pulses,
    )
}

/// Controller after `init`, with the init traffic already drained from `log`.
pub fn controller<'a>(pulses: &'a PulseAccumulator, log: &Log) -> FakeController<'a> {
    let synth = BurstSynthesizer::new(
        FakeCarrier(log.clone()),
        FakeScheduler {
            log: log.clone(),
            masked: false,
        },
        SynthConfig::DEFAULT,
        DEFAULT_BURST_TABLE,
    );
    let mut controller = TachController::new(
        arbiter(pulses, log),
        EdgeCaptureCounter::new(tach_config(), pulses),
        synth,
    );
    controller.init(CLOCK_HZ);
    log.take();
    controller
}

/// Edge timestamp in cycles for `micros` after boot.
pub fn at_us(micros: u32) -> u32 {
    micros * (CLOCK_HZ / 1_000_000)
}

#[derive(Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}
