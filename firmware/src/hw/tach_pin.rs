//! PA6 pad control and its EXTI line.

use embassy_stm32::interrupt::{Interrupt, InterruptExt};
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{Moder, Pupdr};
use tach_core::irq::IrqLine;
use tach_core::pin::TachPin;

use crate::board::{TACH_PIN, TACH_PIN_AF, tach_edge_pending};

const EDGE_IRQ: Interrupt = Interrupt::EXTI4_15;

/// Routes EXTI line 6 to port A on the falling edge. The NVIC line stays off
/// until the pin arbiter hands the pad to capture.
pub fn configure_edge_line() {
    EDGE_IRQ.disable();
    pac::EXTI
        .exticr(TACH_PIN / 4)
        .modify(|w| w.set_exti(TACH_PIN % 4, 0));
    pac::EXTI.rtsr(0).modify(|w| w.set_line(TACH_PIN, false));
    pac::EXTI.ftsr(0).modify(|w| w.set_line(TACH_PIN, true));
    pac::EXTI.imr(0).modify(|w| w.set_line(TACH_PIN, true));
    clear_edge_flag();
}

/// Clears the tach line's falling-edge flag if it is set and reports whether
/// it was. Other lines sharing EXTI4_15 are left alone.
pub fn take_edge_flag() -> bool {
    let pending = tach_edge_pending(pac::EXTI.fpr(0).read().0);
    if pending {
        clear_edge_flag();
    }
    pending
}

/// Clears the EXTI falling-edge flag.
pub fn clear_edge_flag() {
    pac::EXTI.fpr(0).write(|w| w.set_line(TACH_PIN, true));
}

pub struct TachPad;

impl TachPin for TachPad {
    fn into_capture_input(&mut self) {
        let gpio = pac::GPIOA;
        gpio.pupdr().modify(|w| w.set_pupdr(TACH_PIN, Pupdr::PULL_UP));
        gpio.moder().modify(|w| w.set_moder(TACH_PIN, Moder::INPUT));
    }

    fn into_carrier_output(&mut self) {
        let gpio = pac::GPIOA;
        gpio.afr(TACH_PIN / 8)
            .modify(|w| w.set_afr(TACH_PIN % 8, TACH_PIN_AF));
        gpio.moder()
            .modify(|w| w.set_moder(TACH_PIN, Moder::ALTERNATE));
    }

    fn drive_low(&mut self) {
        let gpio = pac::GPIOA;
        gpio.bsrr().write(|w| w.set_br(TACH_PIN, true));
        gpio.pupdr()
            .modify(|w| w.set_pupdr(TACH_PIN, Pupdr::FLOATING));
        gpio.moder().modify(|w| w.set_moder(TACH_PIN, Moder::OUTPUT));
    }
}

/// NVIC view of the tach edge interrupt.
pub struct EdgeIrq;

impl IrqLine for EdgeIrq {
    fn mask(&mut self) {
        EDGE_IRQ.disable();
    }

    fn unmask(&mut self) {
        // SAFETY: the EXTI4_15 handler only touches the pulse accumulator.
        unsafe { EDGE_IRQ.enable() };
    }

    fn clear_pending(&mut self) {
        clear_edge_flag();
        EDGE_IRQ.unpend();
    }

    fn is_masked(&self) -> bool {
        !EDGE_IRQ.is_enabled()
    }
}
