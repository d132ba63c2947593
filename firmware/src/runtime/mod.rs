use core::cell::RefCell;

use cortex_m::interrupt;
use cortex_m::register::primask;
use cortex_m_rt::exception;
use critical_section::{self, Mutex, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use tach_core::TachController;
use tach_core::capture::{EdgeCaptureCounter, PulseAccumulator};
use tach_core::diag::DiagSwitch;
use tach_core::duty::DutyCommand;
use tach_core::pin::PinArbiter;
use tach_core::synth::{BurstSynthesizer, DEFAULT_BURST_TABLE};
use tach_core::timebase::Timebase;

use crate::board::{SYNTH_CONFIG, SYSCLK_HZ, TACH_CONFIG};
use crate::diag::{DiagQueue, DropCounter};
use crate::hw::fan_pwm::FanPwm;
use crate::hw::tach_pin::{self, EdgeIrq, TachPad};
use crate::hw::timers::{Tim2Scheduler, Tim3Carrier};
use crate::hw::{self, SysTickCountdown};

mod console_task;
mod diag_task;
mod tach_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type FirmwareTach =
    TachController<'static, TachPad, EdgeIrq, Tim3Carrier, Tim2Scheduler>;

pub(super) static TIMEBASE: Timebase<SysTickCountdown> = Timebase::new(SysTickCountdown);
pub(super) static PULSES: PulseAccumulator = PulseAccumulator::new();
pub(super) static DUTY: DutyCommand = DutyCommand::new(tach_core::duty::DEFAULT_DUTY_PERCENT);
pub(super) static TACH: Mutex<RefCell<Option<FirmwareTach>>> = Mutex::new(RefCell::new(None));
pub(super) static DIAG_LINES: DiagQueue<CriticalSectionRawMutex> = Channel::new();
pub(super) static DIAG_DROPPED: DropCounter = DropCounter::new();
pub(super) static DIAG_SWITCH: DiagSwitch = DiagSwitch::new(true);

#[exception]
fn SysTick() {
    TIMEBASE.on_tick();
}

#[hal::interrupt]
fn EXTI4_15() {
    if tach_pin::take_edge_flag() {
        PULSES.record_edge(TIMEBASE.cycles32());
    }
}

#[hal::interrupt]
fn TIM2() {
    critical_section::with(|cs| {
        if let Some(tach) = TACH.borrow_ref_mut(cs).as_mut() {
            tach.on_scheduler_timeout(DUTY.percent());
        }
    });
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA2,
        PA3,
        PA9,
        PA10,
        USART1,
        USART2,
        PA6,
        PB9,
        TIM2,
        TIM3,
        TIM17,
        ..
    } = hal::init(config);
    // Claimed here so no HAL driver touches them; `hw` drives them through the PAC.
    let _register_level = (PA6, PB9, TIM2, TIM3, TIM17);

    hw::enable_clocks();
    TIMEBASE.init(SYSCLK_HZ);
    tach_pin::configure_edge_line();

    let arbiter = PinArbiter::new(TachPad, EdgeIrq, &PULSES);
    let capture = EdgeCaptureCounter::new(TACH_CONFIG, &PULSES);
    let synth = BurstSynthesizer::new(
        Tim3Carrier,
        Tim2Scheduler,
        SYNTH_CONFIG,
        DEFAULT_BURST_TABLE,
    );
    let mut tach = TachController::new(arbiter, capture, synth);
    tach.init(TIMEBASE.clock_hz());
    critical_section::with(|cs| *TACH.borrow_ref_mut(cs) = Some(tach));
    defmt::info!(
        "tach: ready clock_hz={} min_edge_cycles={}",
        TIMEBASE.clock_hz(),
        PULSES.min_edge_cycles()
    );

    let fan = FanPwm::new(SYSCLK_HZ, DUTY.percent());

    spawner
        .spawn(tach_task::run(fan))
        .expect("failed to spawn tach task");
    spawner
        .spawn(diag_task::run(USART1, PA9, PA10))
        .expect("failed to spawn diagnostic UART task");
    spawner
        .spawn(console_task::run(USART2, PA2, PA3))
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
