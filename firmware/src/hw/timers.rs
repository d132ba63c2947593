//! TIM3 carrier and TIM2 one-shot burst scheduler.

use embassy_stm32::interrupt::{Interrupt, InterruptExt};
use embassy_stm32::pac;
use embassy_stm32::pac::timer::vals::{Ocm, Urs};
use tach_core::irq::IrqLine;
use tach_core::synth::{CarrierTimer, OneShotTimer};

const SCHEDULER_IRQ: Interrupt = Interrupt::TIM2;

/// TIM3_CH1 square wave on the tach pin.
pub struct Tim3Carrier;

impl CarrierTimer for Tim3Carrier {
    fn configure(&mut self, period: u32, compare: u32) {
        let tim = pac::TIM3;
        let arr = u16::try_from(period.saturating_sub(1)).unwrap_or(u16::MAX);
        let ccr = u16::try_from(compare).unwrap_or(u16::MAX);

        tim.cr1().modify(|w| w.set_cen(false));
        tim.psc().write_value(0);
        tim.arr().write(|w| w.set_arr(arr));
        tim.ccr(0).write(|w| w.set_ccr(ccr));
        tim.ccmr_output(0).modify(|w| {
            w.set_ocm(0, Ocm::PWM_MODE1);
            w.set_ocpe(0, true);
        });
        tim.ccer().modify(|w| w.set_cce(0, true));
        tim.egr().write(|w| w.set_ug(true));
    }

    fn enable(&mut self) {
        let tim = pac::TIM3;
        tim.cnt().write(|w| w.set_cnt(0));
        tim.cr1().modify(|w| w.set_cen(true));
    }

    fn disable(&mut self) {
        pac::TIM3.cr1().modify(|w| w.set_cen(false));
    }
}

/// TIM2 in one-pulse mode; its update interrupt advances the burst state.
pub struct Tim2Scheduler;

impl IrqLine for Tim2Scheduler {
    fn mask(&mut self) {
        SCHEDULER_IRQ.disable();
    }

    fn unmask(&mut self) {
        // SAFETY: the TIM2 handler reaches the synthesizer only through the
        // controller critical section.
        unsafe { SCHEDULER_IRQ.enable() };
    }

    fn clear_pending(&mut self) {
        pac::TIM2.sr().modify(|w| w.set_uif(false));
        SCHEDULER_IRQ.unpend();
    }

    fn is_masked(&self) -> bool {
        !SCHEDULER_IRQ.is_enabled()
    }
}

impl OneShotTimer for Tim2Scheduler {
    fn configure_one_shot(&mut self) {
        let tim = pac::TIM2;
        tim.cr1().modify(|w| {
            w.set_cen(false);
            w.set_opm(true);
            w.set_urs(Urs::COUNTER_ONLY);
        });
        tim.psc().write_value(0);
        tim.dier().modify(|w| w.set_uie(true));
        tim.sr().modify(|w| w.set_uif(false));
    }

    fn arm(&mut self, cycles: u32) {
        let tim = pac::TIM2;
        // The update event fires when the counter rolls over from ARR.
        tim.arr().write(|w| w.set_arr(cycles.saturating_sub(1).max(1)));
        tim.cnt().write(|w| w.set_cnt(0));
        tim.cr1().modify(|w| w.set_cen(true));
    }

    fn disarm(&mut self) {
        let tim = pac::TIM2;
        tim.cr1().modify(|w| w.set_cen(false));
        tim.sr().modify(|w| w.set_uif(false));
        SCHEDULER_IRQ.unpend();
    }

    fn acknowledge(&mut self) {
        pac::TIM2.sr().modify(|w| w.set_uif(false));
    }
}
