//! Textual rendering of console responses.
//!
//! [`StatusFormatter`] renders the `STATUS` lines and [`write_response`]
//! renders any command result, so the firmware and emulator print the same
//! text.

use core::fmt;

use crate::controller::TachStatus;
use crate::synth::BurstState;

use super::catalog::{self, CommandSpec};
use super::commands::{CommandError, CommandOutcome};

/// Inputs to the `STATUS` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub duty_percent: u8,
    pub tach: TachStatus,
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// `duty 30%`
    pub fn write_duty_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "duty {}%", self.snapshot.duty_percent)
    }

    /// `tach pin=CAPTURE capture=on reporting=off synth=off`
    pub fn write_pin_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let tach = &self.snapshot.tach;
        write!(
            writer,
            "tach pin={} capture={} reporting={} synth={}",
            tach.pin_owner.label(),
            on_off(tach.capture_enabled),
            on_off(tach.reporting_enabled),
            on_off(tach.synth_enabled),
        )
    }

    /// `window pulses=12 rejects=0`
    pub fn write_window_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let pending = self.snapshot.tach.pending;
        write!(
            writer,
            "window pulses={} rejects={}",
            pending.accepted, pending.rejected
        )
    }

    /// `burst phase=PULSES pulses=35 tail_us=96 started=120`
    pub fn write_burst_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let tach = &self.snapshot.tach;
        write!(writer, "burst phase={}", tach.burst.label())?;
        if let BurstState::Pulses(target) | BurstState::Tail(target) = tach.burst {
            write!(writer, " pulses={} tail_us={}", target.pulses, target.tail_us)?;
        }
        write!(writer, " started={}", tach.bursts_started)
    }

    /// All status lines, each followed by `eol`.
    pub fn write_all<W: fmt::Write>(&self, writer: &mut W, eol: &str) -> fmt::Result {
        self.write_duty_line(writer)?;
        writer.write_str(eol)?;
        self.write_pin_line(writer)?;
        writer.write_str(eol)?;
        self.write_window_line(writer)?;
        writer.write_str(eol)?;
        self.write_burst_line(writer)?;
        writer.write_str(eol)
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn on_off_upper(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}

/// Writes the console response for one executed line, each output line
/// followed by `eol`. A blank line produces no output.
pub fn write_response<W: fmt::Write>(
    writer: &mut W,
    result: &Result<CommandOutcome, CommandError>,
    eol: &str,
) -> fmt::Result {
    match result {
        Ok(CommandOutcome::Idle) => Ok(()),
        Ok(CommandOutcome::DutySet(percent)) => {
            write!(writer, "OK: duty set to {percent}%{eol}")
        }
        Ok(CommandOutcome::Reporting(enabled)) => {
            write!(writer, "OK: TACHIN {}{eol}", on_off_upper(*enabled))
        }
        Ok(CommandOutcome::Capture(enabled)) => {
            write!(writer, "OK: TACHCAP {}{eol}", on_off_upper(*enabled))
        }
        Ok(CommandOutcome::Synth(enabled)) => {
            write!(writer, "OK: TSYN {}{eol}", on_off_upper(*enabled))
        }
        Ok(CommandOutcome::Debug(enabled)) => {
            write!(writer, "OK: DEBUG {}{eol}", on_off_upper(*enabled))
        }
        Ok(CommandOutcome::Status(snapshot)) => StatusFormatter::new(snapshot).write_all(writer, eol),
        Ok(CommandOutcome::Help(None)) => {
            write!(writer, "Available commands:{eol}")?;
            for spec in catalog::commands() {
                write_help_entry(writer, spec)?;
                writer.write_str(eol)?;
            }
            Ok(())
        }
        Ok(CommandOutcome::Help(Some(spec))) => {
            write_help_entry(writer, spec)?;
            writer.write_str(eol)
        }
        Err(error) => write!(writer, "ERROR: {error}{eol}"),
    }
}

fn write_help_entry<W: fmt::Write>(writer: &mut W, spec: &CommandSpec) -> fmt::Result {
    write!(writer, "  {:<16}{}", spec.usage, spec.summary)
}
