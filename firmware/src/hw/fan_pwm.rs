//! Fan PWM on TIM17_CH1 (PB9).

use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::Moder;
use embassy_stm32::pac::timer::vals::Ocm;
use tach_core::duty::{pulse_width, pwm_period};

use crate::board::{FAN_PWM_AF, FAN_PWM_FREQ_HZ, FAN_PWM_PIN};

pub struct FanPwm {
    period: u16,
}

impl FanPwm {
    /// Starts the PWM at `percent` duty.
    #[must_use]
    pub fn new(clock_hz: u32, percent: u8) -> Self {
        let period = pwm_period(clock_hz, FAN_PWM_FREQ_HZ);

        let gpio = pac::GPIOB;
        gpio.afr(FAN_PWM_PIN / 8)
            .modify(|w| w.set_afr(FAN_PWM_PIN % 8, FAN_PWM_AF));
        gpio.moder()
            .modify(|w| w.set_moder(FAN_PWM_PIN, Moder::ALTERNATE));

        let tim = pac::TIM17;
        tim.cr1().modify(|w| w.set_cen(false));
        tim.psc().write_value(0);
        tim.arr().write(|w| w.set_arr(period - 1));
        tim.ccr(0)
            .write(|w| w.set_ccr(pulse_width(period, percent)));
        tim.ccmr_output(0).modify(|w| {
            w.set_ocm(0, Ocm::PWM_MODE1);
            w.set_ocpe(0, true);
        });
        tim.ccer().modify(|w| w.set_cce(0, true));
        tim.bdtr().modify(|w| w.set_moe(true));
        tim.egr().write(|w| w.set_ug(true));
        tim.cr1().modify(|w| {
            w.set_arpe(true);
            w.set_cen(true);
        });

        Self { period }
    }

    /// Loads a new compare value; it takes effect at the next PWM period.
    pub fn set_percent(&mut self, percent: u8) {
        let width = pulse_width(self.period, percent);
        pac::TIM17.ccr(0).write(|w| w.set_ccr(width));
    }
}
