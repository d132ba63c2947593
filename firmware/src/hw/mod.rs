//! Register-level adapters that back the `tach-core` hardware traits.
//!
//! Embassy's drivers cover the UARTs; the tach pin, its EXTI line and the
//! three timers involved (TIM2 scheduler, TIM3 carrier, TIM17 fan PWM) need
//! mid-flight reconfiguration that the HAL drivers do not expose, so they are
//! programmed through the PAC here.

pub mod fan_pwm;
pub mod tach_pin;
pub mod timers;

use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use embassy_stm32::pac;
use tach_core::timebase::Countdown;

/// Turns on the peripheral clocks used by the adapters in this module.
pub fn enable_clocks() {
    pac::RCC.iopenr().modify(|w| {
        w.set_gpioaen(true);
        w.set_gpioben(true);
    });
    pac::RCC.apbenr1().modify(|w| {
        w.set_tim2en(true);
        w.set_tim3en(true);
    });
    pac::RCC.apbenr2().modify(|w| {
        w.set_syscfgen(true);
        w.set_tim17en(true);
    });
}

/// Core SysTick as the 1 ms timebase countdown.
pub struct SysTickCountdown;

impl Countdown for SysTickCountdown {
    fn start_periodic(&self, reload: u32) {
        // SAFETY: SysTick is owned by the timebase; embassy runs its clock on TIM1.
        let mut syst = unsafe { cortex_m::Peripherals::steal() }.SYST;
        syst.disable_counter();
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(reload.saturating_sub(1));
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();
    }

    fn remaining(&self) -> u32 {
        SYST::get_current()
    }
}
