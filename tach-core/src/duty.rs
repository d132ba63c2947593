//! Commanded fan duty.
//!
//! The console writes the duty, the fan PWM output follows it and the burst
//! synthesizer reads it once per burst from the scheduler interrupt.

use core::fmt;

use portable_atomic::{AtomicU8, Ordering};

pub const DEFAULT_DUTY_PERCENT: u8 = 30;

/// Smallest duty accepted by `PSYN`.
pub const PSYN_MIN: u8 = 5;
/// Largest duty accepted by `PSYN`.
pub const PSYN_MAX: u8 = 96;

/// Fan PWM frequency.
pub const FAN_PWM_HZ: u32 = 21_500;

/// Rejected duty request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DutyOutOfRange(pub i32);

impl fmt::Display for DutyOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value out of range ({PSYN_MIN}..{PSYN_MAX})")
    }
}

pub struct DutyCommand {
    percent: AtomicU8,
}

impl DutyCommand {
    #[must_use]
    pub const fn new(percent: u8) -> Self {
        Self {
            percent: AtomicU8::new(percent),
        }
    }

    /// Stores `percent` if it lies within `PSYN_MIN..=PSYN_MAX`.
    pub fn set_percent(&self, percent: i32) -> Result<u8, DutyOutOfRange> {
        match u8::try_from(percent) {
            Ok(value) if (PSYN_MIN..=PSYN_MAX).contains(&value) => {
                self.percent.store(value, Ordering::Release);
                Ok(value)
            }
            _ => Err(DutyOutOfRange(percent)),
        }
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }
}

impl Default for DutyCommand {
    fn default() -> Self {
        Self::new(DEFAULT_DUTY_PERCENT)
    }
}

/// PWM period in timer ticks for a `freq_hz` output, rounded to nearest and
/// kept within a 16-bit auto-reload register.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn pwm_period(clock_hz: u32, freq_hz: u32) -> u16 {
    if freq_hz == 0 {
        return u16::MAX;
    }
    let period = (clock_hz as u64 + freq_hz as u64 / 2) / freq_hz as u64;
    if period == 0 {
        1
    } else if period > u16::MAX as u64 {
        u16::MAX
    } else {
        period as u16
    }
}

/// Compare value giving `percent` duty on a `period`-tick PWM.
///
/// The result stays inside `1..period` so the output never degenerates to a
/// constant level.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn pulse_width(period: u16, percent: u8) -> u16 {
    if period <= 1 {
        return 1;
    }
    let percent = if percent > 100 { 100 } else { percent };
    let width = period as u32 * percent as u32 / 100;
    let max = period as u32 - 1;
    if width == 0 {
        1
    } else if width > max {
        max as u16
    } else {
        width as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psyn_range_is_enforced() {
        let duty = DutyCommand::default();
        assert_eq!(duty.percent(), 30);
        assert_eq!(duty.set_percent(5), Ok(5));
        assert_eq!(duty.set_percent(96), Ok(96));
        assert_eq!(duty.set_percent(4), Err(DutyOutOfRange(4)));
        assert_eq!(duty.set_percent(97), Err(DutyOutOfRange(97)));
        assert_eq!(duty.set_percent(300), Err(DutyOutOfRange(300)));
        assert_eq!(duty.set_percent(-3), Err(DutyOutOfRange(-3)));
        assert_eq!(duty.percent(), 96);
    }

    #[test]
    fn pwm_period_rounds_to_nearest() {
        assert_eq!(pwm_period(16_000_000, FAN_PWM_HZ), 744);
        assert_eq!(pwm_period(64_000_000, FAN_PWM_HZ), 2_977);
        assert_eq!(pwm_period(10, FAN_PWM_HZ), 1);
        assert_eq!(pwm_period(u32::MAX, 1), u16::MAX);
    }

    #[test]
    fn pulse_width_stays_inside_period() {
        assert_eq!(pulse_width(744, 30), 223);
        assert_eq!(pulse_width(744, 0), 1);
        assert_eq!(pulse_width(744, 100), 743);
        assert_eq!(pulse_width(744, 200), 743);
        assert_eq!(pulse_width(1, 50), 1);
    }
}
