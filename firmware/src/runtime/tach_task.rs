use embassy_time::{Duration, Ticker};

use super::{DIAG_DROPPED, DIAG_LINES, DIAG_SWITCH, DUTY, TACH, TIMEBASE};
use crate::board::TACH_POLL_MS;
use crate::diag::QueueSink;
use crate::hw::fan_pwm::FanPwm;

/// Cooperative half of the tach subsystem: closes reporting windows and
/// follows the commanded duty on the fan PWM.
#[embassy_executor::task]
pub async fn run(mut fan: FanPwm) -> ! {
    let mut sink = QueueSink::new(&DIAG_LINES, &DIAG_DROPPED, &DIAG_SWITCH);
    let mut ticker = Ticker::every(Duration::from_millis(TACH_POLL_MS));
    let mut applied = DUTY.percent();

    loop {
        let now_ms = TIMEBASE.millis();
        critical_section::with(|cs| {
            if let Some(tach) = TACH.borrow_ref_mut(cs).as_mut() {
                tach.poll(now_ms, &mut sink);
            }
        });

        let duty = DUTY.percent();
        if duty != applied {
            fan.set_percent(duty);
            applied = duty;
            defmt::info!("fan: duty {}%", duty);
        }

        ticker.next().await;
    }
}
