use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig};
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use static_cell::StaticCell;

use super::{DIAG_DROPPED, DIAG_LINES};
use crate::board::{DIAG_BAUD, DIAG_TX_BUFFER};
use crate::console::EOL;

static TX_BUFFER: StaticCell<[u8; DIAG_TX_BUFFER]> = StaticCell::new();
static RX_BUFFER: StaticCell<[u8; 16]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct DiagIrqs {
    USART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART1>;
});

/// Drains diagnostic lines to USART1.
#[embassy_executor::task]
pub async fn run(
    usart: Peri<'static, hal::peripherals::USART1>,
    tx_pin: Peri<'static, hal::peripherals::PA9>,
    rx_pin: Peri<'static, hal::peripherals::PA10>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = DIAG_BAUD;

    let mut uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        TX_BUFFER.init([0; DIAG_TX_BUFFER]),
        RX_BUFFER.init([0; 16]),
        DiagIrqs,
        config,
    )
    .expect("failed to initialize diagnostic UART");

    let receiver = DIAG_LINES.receiver();
    loop {
        let line = receiver.receive().await;

        let dropped = DIAG_DROPPED.take();
        if dropped > 0 {
            defmt::warn!("diag: dropped {} lines", dropped);
        }

        let written = match uart.write_all(line.as_bytes()).await {
            Ok(()) => uart.write_all(EOL.as_bytes()).await,
            Err(err) => Err(err),
        };
        if written.is_err() {
            defmt::warn!("diag: UART write error");
            Timer::after(Duration::from_millis(5)).await;
        }
    }
}
