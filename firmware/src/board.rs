//! Board wiring and clock constants for the STM32G0B1 fan controller.

use tach_core::config::{SynthConfig, TachConfig};
use tach_core::duty::FAN_PWM_HZ;

/// HSI16 with the default `embassy_stm32::Config` (no PLL).
pub const SYSCLK_HZ: u32 = 16_000_000;

/// GPIOA register block.
pub const GPIOA_BASE: u32 = 0x5000_0000;

/// Tach pin PA6: EXTI line 6 for capture, TIM3_CH1 (AF1) for synthesis.
pub const TACH_PIN: usize = 6;
pub const TACH_PIN_AF: u8 = 1;

/// Whether an EXTI falling-pending register value flags the tach line.
#[must_use]
pub const fn tach_edge_pending(fpr: u32) -> bool {
    fpr & (1 << TACH_PIN) != 0
}

pub const TACH_CONFIG: TachConfig = TachConfig::DEFAULT.with_pin(GPIOA_BASE, 1 << TACH_PIN);
pub const SYNTH_CONFIG: SynthConfig = SynthConfig::DEFAULT;

/// Operator console on USART2 (PA2 TX, PA3 RX).
pub const CONSOLE_BAUD: u32 = 115_200;

/// Diagnostic stream on USART1 (PA9 TX, PA10 RX).
pub const DIAG_BAUD: u32 = 115_200;

/// Fan PWM on TIM17_CH1 (PB9, AF2).
pub const FAN_PWM_AF: u8 = 2;
pub const FAN_PWM_PIN: usize = 9;
pub const FAN_PWM_FREQ_HZ: u32 = FAN_PWM_HZ;

/// Diagnostic lines buffered between the tach task and the diagnostic UART.
pub const DIAG_QUEUE_DEPTH: usize = 8;

pub const CONSOLE_RX_BUFFER: usize = 64;
pub const CONSOLE_TX_BUFFER: usize = 512;
pub const DIAG_TX_BUFFER: usize = 256;

/// Polling period of the cooperative tach task.
pub const TACH_POLL_MS: u64 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use tach_core::duty::pwm_period;

    #[test]
    fn tach_pin_mask_matches_pa6() {
        assert_eq!(TACH_CONFIG.gpio_base, 0x5000_0000);
        assert_eq!(TACH_CONFIG.pin_mask, 0x0000_0040);
    }

    #[test]
    fn only_the_tach_line_counts_as_a_tach_edge() {
        assert!(tach_edge_pending(1 << 6));
        assert!(tach_edge_pending((1 << 6) | (1 << 4)));
        assert!(!tach_edge_pending(1 << 4));
        assert!(!tach_edge_pending(0));
    }

    #[test]
    fn fan_pwm_period_fits_a_16_bit_timer() {
        assert_eq!(pwm_period(SYSCLK_HZ, FAN_PWM_FREQ_HZ), 744);
    }
}
