//! Diagnostic output lines.

use core::fmt::{self, Write};

use heapless::String;
use portable_atomic::{AtomicBool, Ordering};

/// Longest diagnostic line, excluding the line terminator.
pub const DIAG_LINE_CAPACITY: usize = 96;

pub type DiagLine = String<DIAG_LINE_CAPACITY>;

/// Destination for diagnostic lines (a UART, a log, a test buffer).
pub trait DiagnosticSink {
    /// Emits one line. The sink appends its own terminator.
    fn emit(&mut self, line: &str);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, line: &str) {
        (**self).emit(line);
    }
}

/// Operator switch for the diagnostic stream, flipped by `DEBUG ON|OFF`.
#[derive(Debug)]
pub struct DiagSwitch(AtomicBool);

impl DiagSwitch {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self(AtomicBool::new(enabled))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for DiagSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Forwards lines to `inner` only while `switch` is on.
pub struct Gated<'a, S> {
    inner: S,
    switch: &'a DiagSwitch,
}

impl<'a, S: DiagnosticSink> Gated<'a, S> {
    #[must_use]
    pub const fn new(inner: S, switch: &'a DiagSwitch) -> Self {
        Self { inner, switch }
    }
}

impl<S: DiagnosticSink> DiagnosticSink for Gated<'_, S> {
    fn emit(&mut self, line: &str) {
        if self.switch.is_enabled() {
            self.inner.emit(line);
        }
    }
}

/// Formats `value` into a bounded line, truncating on overflow.
#[must_use]
pub fn render(value: &impl fmt::Display) -> DiagLine {
    let mut writer = Truncating(DiagLine::new());
    let _ = write!(writer, "{value}");
    writer.0
}

struct Truncating(DiagLine);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}

/// One closed reporting window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TachReport {
    pub pulses: u32,
    pub rejects: u32,
    pub rpm: u32,
}

impl fmt::Display for TachReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TACH pulses={} rejects={} rpm={}",
            self.pulses, self.rejects, self.rpm
        )
    }
}

/// Line emitted when reporting is switched on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CaptureBanner {
    pub gpio_base: u32,
    pub pin_mask: u32,
}

impl fmt::Display for CaptureBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TACHIN ON: gpio_base=0x{:08X} pin_mask=0x{:08X} edge=FALL pullup=WPU",
            self.gpio_base, self.pin_mask
        )
    }
}
