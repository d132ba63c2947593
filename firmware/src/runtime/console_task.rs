use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use static_cell::StaticCell;
use tach_core::console::commands::{CommandError, CommandExecutor, CommandOutcome};

use super::{DIAG_DROPPED, DIAG_LINES, DIAG_SWITCH, DUTY, TACH, TIMEBASE};
use crate::board::{CONSOLE_BAUD, CONSOLE_RX_BUFFER, CONSOLE_TX_BUFFER};
use crate::console::{ConsoleSession, Reply};
use crate::diag::QueueSink;

static TX_BUFFER: StaticCell<[u8; CONSOLE_TX_BUFFER]> = StaticCell::new();
static RX_BUFFER: StaticCell<[u8; CONSOLE_RX_BUFFER]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct ConsoleIrqs {
    USART2_LPUART2 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART2>;
});

/// Operator console on USART2.
#[embassy_executor::task]
pub async fn run(
    usart: Peri<'static, hal::peripherals::USART2>,
    tx_pin: Peri<'static, hal::peripherals::PA2>,
    rx_pin: Peri<'static, hal::peripherals::PA3>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = CONSOLE_BAUD;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        TX_BUFFER.init([0; CONSOLE_TX_BUFFER]),
        RX_BUFFER.init([0; CONSOLE_RX_BUFFER]),
        ConsoleIrqs,
        config,
    )
    .expect("failed to initialize console UART");
    let (mut uart_tx, mut uart_rx) = uart.split();

    let mut session = ConsoleSession::new();
    let mut reply = Reply::new();
    if ConsoleSession::greet(&mut reply).is_ok()
        && uart_tx.write_all(reply.as_bytes()).await.is_err()
    {
        defmt::warn!("console: UART write error");
    }

    let mut ingress = [0u8; 16];
    loop {
        let count = match uart_rx.read(&mut ingress).await {
            Ok(count) => count,
            Err(_) => {
                defmt::warn!("console: UART read error");
                Timer::after(Duration::from_millis(5)).await;
                continue;
            }
        };

        for &byte in &ingress[..count] {
            reply.clear();
            if session.feed(byte, &mut reply, execute_line).is_err() {
                defmt::warn!("console: reply truncated");
            }
            if !reply.is_empty() && uart_tx.write_all(reply.as_bytes()).await.is_err() {
                defmt::warn!("console: UART write error");
            }
        }
    }
}

fn execute_line(line: &str) -> Result<CommandOutcome, CommandError> {
    let now_ms = TIMEBASE.millis();
    let mut sink = QueueSink::new(&DIAG_LINES, &DIAG_DROPPED, &DIAG_SWITCH);

    let result = critical_section::with(|cs| {
        let mut slot = TACH.borrow_ref_mut(cs);
        let Some(tach) = slot.as_mut() else {
            return Ok(CommandOutcome::Idle);
        };
        CommandExecutor::new(tach, &DUTY, &DIAG_SWITCH).execute(line, now_ms, &mut sink)
    });

    match &result {
        Ok(CommandOutcome::Capture(enabled)) => defmt::info!("tach: capture {}", enabled),
        Ok(CommandOutcome::Synth(enabled)) => defmt::info!("tach: synth {}", enabled),
        Ok(CommandOutcome::Reporting(enabled)) => defmt::info!("tach: reporting {}", enabled),
        Ok(CommandOutcome::Debug(enabled)) => defmt::info!("diag: stream {}", enabled),
        Ok(_) => {}
        Err(err) => defmt::warn!("console: {}", defmt::Display2Format(err)),
    }
    result
}
