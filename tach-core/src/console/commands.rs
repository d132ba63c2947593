//! Console command dispatcher.
//!
//! Turns parsed lines into calls on the duty command and the tach subsystem.
//! The tach side sits behind [`TachOps`] so the firmware can route each call
//! through its critical section while tests and the emulator call the
//! controller directly.

use core::fmt;

use crate::controller::{TachController, TachStatus};
use crate::diag::{DiagSwitch, DiagnosticSink};
use crate::duty::{DutyCommand, DutyOutOfRange};
use crate::irq::IrqLine;
use crate::pin::{PinBusy, TachPin};
use crate::synth::{CarrierTimer, OneShotTimer};

use super::catalog::CommandSpec;
use super::grammar::{self, Command, ParseError};
use super::status::StatusSnapshot;

/// Tach operations reachable from the console.
pub trait TachOps {
    fn capture_enable(&mut self, enabled: bool) -> Result<(), PinBusy>;
    fn reporting_enable(&mut self, enabled: bool, now_ms: u32, sink: &mut dyn DiagnosticSink);
    fn synth_enable(&mut self, enabled: bool);
    fn tach_status(&self) -> TachStatus;
}

impl<P, E, C, S> TachOps for TachController<'_, P, E, C, S>
where
    P: TachPin,
    E: IrqLine,
    C: CarrierTimer,
    S: OneShotTimer,
{
    fn capture_enable(&mut self, enabled: bool) -> Result<(), PinBusy> {
        TachController::capture_enable(self, enabled)
    }

    fn reporting_enable(&mut self, enabled: bool, now_ms: u32, sink: &mut dyn DiagnosticSink) {
        TachController::reporting_enable(self, enabled, now_ms, sink);
    }

    fn synth_enable(&mut self, enabled: bool) {
        TachController::synth_enable(self, enabled);
    }

    fn tach_status(&self) -> TachStatus {
        self.status()
    }
}

impl<T: TachOps + ?Sized> TachOps for &mut T {
    fn capture_enable(&mut self, enabled: bool) -> Result<(), PinBusy> {
        (**self).capture_enable(enabled)
    }

    fn reporting_enable(&mut self, enabled: bool, now_ms: u32, sink: &mut dyn DiagnosticSink) {
        (**self).reporting_enable(enabled, now_ms, sink);
    }

    fn synth_enable(&mut self, enabled: bool) {
        (**self).synth_enable(enabled);
    }

    fn tach_status(&self) -> TachStatus {
        (**self).tach_status()
    }
}

/// Command execution successes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Blank line; only the prompt is reprinted.
    Idle,
    DutySet(u8),
    Reporting(bool),
    Capture(bool),
    Synth(bool),
    Debug(bool),
    Status(StatusSnapshot),
    Help(Option<&'static CommandSpec>),
}

/// Errors surfaced while executing a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandError {
    Parse(ParseError),
    Duty(DutyOutOfRange),
    PinBusy(PinBusy),
}

impl From<ParseError> for CommandError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<DutyOutOfRange> for CommandError {
    fn from(error: DutyOutOfRange) -> Self {
        Self::Duty(error)
    }
}

impl From<PinBusy> for CommandError {
    fn from(error: PinBusy) -> Self {
        Self::PinBusy(error)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(err) => err.fmt(f),
            CommandError::Duty(err) => err.fmt(f),
            CommandError::PinBusy(err) => err.fmt(f),
        }
    }
}

/// Dispatches console commands.
pub struct CommandExecutor<'d, T> {
    tach: T,
    duty: &'d DutyCommand,
    diag: &'d DiagSwitch,
}

impl<'d, T> CommandExecutor<'d, T> {
    #[must_use]
    pub const fn new(tach: T, duty: &'d DutyCommand, diag: &'d DiagSwitch) -> Self {
        Self { tach, duty, diag }
    }

    #[must_use]
    pub fn tach(&self) -> &T {
        &self.tach
    }
}

impl<T: TachOps> CommandExecutor<'_, T> {
    /// Parses and executes one console line received at `now_ms`.
    ///
    /// Diagnostic side effects (the capture banner) go to `sink`.
    pub fn execute(
        &mut self,
        line: &str,
        now_ms: u32,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<CommandOutcome, CommandError> {
        let command = match grammar::parse(line) {
            Ok(command) => command,
            Err(ParseError::Empty) => return Ok(CommandOutcome::Idle),
            Err(err) => return Err(err.into()),
        };
        self.dispatch(command, now_ms, sink)
    }

    fn dispatch(
        &mut self,
        command: Command,
        now_ms: u32,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::Psyn(value) => {
                let percent = self.duty.set_percent(value)?;
                Ok(CommandOutcome::DutySet(percent))
            }
            Command::TachIn(enabled) => {
                self.tach.reporting_enable(enabled, now_ms, sink);
                Ok(CommandOutcome::Reporting(enabled))
            }
            Command::TachCap(enabled) => {
                self.tach.capture_enable(enabled)?;
                Ok(CommandOutcome::Capture(enabled))
            }
            Command::TSyn(enabled) => {
                self.tach.synth_enable(enabled);
                Ok(CommandOutcome::Synth(enabled))
            }
            Command::Debug(enabled) => {
                self.diag.set(enabled);
                Ok(CommandOutcome::Debug(enabled))
            }
            Command::Status => Ok(CommandOutcome::Status(StatusSnapshot {
                duty_percent: self.duty.percent(),
                tach: self.tach.tach_status(),
            })),
            Command::Help(topic) => Ok(CommandOutcome::Help(topic)),
        }
    }
}
