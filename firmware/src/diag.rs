//! Diagnostic line queue between the tach subsystem and the diagnostic UART.
//!
//! Lines are produced inside critical sections (console commands, the tach
//! poll) where blocking is not an option, so the sink only ever `try_send`s
//! and counts what it had to drop. `DEBUG OFF` stops lines from reaching the
//! queue; the defmt mirror keeps logging them.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Sender};
use portable_atomic::{AtomicU32, Ordering};
use tach_core::diag::{DiagLine, DiagSwitch, DiagnosticSink};

use crate::board::DIAG_QUEUE_DEPTH;

pub type DiagQueue<M> = Channel<M, DiagLine, DIAG_QUEUE_DEPTH>;

/// Lines lost because the queue was full.
#[derive(Default)]
pub struct DropCounter(AtomicU32);

impl DropCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn record(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Returns and clears the count.
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// [`DiagnosticSink`] that hands lines to the diagnostic UART task.
pub struct QueueSink<'a, M: RawMutex> {
    sender: Sender<'a, M, DiagLine, DIAG_QUEUE_DEPTH>,
    dropped: &'a DropCounter,
    switch: &'a DiagSwitch,
}

impl<'a, M: RawMutex> QueueSink<'a, M> {
    #[must_use]
    pub fn new(queue: &'a DiagQueue<M>, dropped: &'a DropCounter, switch: &'a DiagSwitch) -> Self {
        Self {
            sender: queue.sender(),
            dropped,
            switch,
        }
    }
}

impl<M: RawMutex> DiagnosticSink for QueueSink<'_, M> {
    fn emit(&mut self, line: &str) {
        #[cfg(target_os = "none")]
        defmt::info!("{=str}", line);

        if !self.switch.is_enabled() {
            return;
        }
        let Ok(owned) = DiagLine::try_from(line) else {
            self.dropped.record();
            return;
        };
        if self.sender.try_send(owned).is_err() {
            self.dropped.record();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn lines_are_queued_in_order() {
        let queue: DiagQueue<NoopRawMutex> = Channel::new();
        let dropped = DropCounter::new();
        let switch = DiagSwitch::default();
        let mut sink = QueueSink::new(&queue, &dropped, &switch);

        sink.emit("TACH pulses=3 rejects=2 rpm=180");
        sink.emit("TACH pulses=0 rejects=0 rpm=0");

        assert_eq!(
            queue.try_receive().ok().as_deref(),
            Some("TACH pulses=3 rejects=2 rpm=180")
        );
        assert_eq!(
            queue.try_receive().ok().as_deref(),
            Some("TACH pulses=0 rejects=0 rpm=0")
        );
        assert_eq!(dropped.take(), 0);
    }

    #[test]
    fn full_queue_counts_drops() {
        let queue: DiagQueue<NoopRawMutex> = Channel::new();
        let dropped = DropCounter::new();
        let switch = DiagSwitch::default();
        let mut sink = QueueSink::new(&queue, &dropped, &switch);

        for _ in 0..DIAG_QUEUE_DEPTH + 3 {
            sink.emit("TACH pulses=1 rejects=0 rpm=60");
        }

        assert_eq!(queue.len(), DIAG_QUEUE_DEPTH);
        assert_eq!(dropped.take(), 3);
        assert_eq!(dropped.take(), 0);
    }

    #[test]
    fn debug_off_keeps_lines_out_of_the_queue() {
        let queue: DiagQueue<NoopRawMutex> = Channel::new();
        let dropped = DropCounter::new();
        let switch = DiagSwitch::new(false);
        let mut sink = QueueSink::new(&queue, &dropped, &switch);

        sink.emit("TACH pulses=3 rejects=0 rpm=180");
        assert!(queue.is_empty());
        assert_eq!(dropped.take(), 0);

        switch.set(true);
        sink.emit("TACH pulses=4 rejects=0 rpm=240");
        assert_eq!(
            queue.try_receive().ok().as_deref(),
            Some("TACH pulses=4 rejects=0 rpm=240")
        );
    }
}
