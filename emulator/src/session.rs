use tach_core::console::commands::{CommandExecutor, CommandOutcome};
use tach_core::console::status::write_response;
use tach_core::diag::{DiagSwitch, DiagnosticSink, Gated};

use crate::sim::Simulator;

pub const EMULATOR_HELP: &[(&str, &str)] = &[
    ("run <ms>", "advance virtual time"),
    ("fan <rpm>", "simulated fan speed (0 stops it)"),
    ("noise on|off", "PWM coupling glitches after each tach edge"),
    ("scope", "bursts seen on the tach pin since the last call"),
    ("exit", "leave the emulator"),
];

/// One line of emulator output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Output {
    /// Response to the typed command.
    Console(String),
    /// Diagnostic line emitted by the tach subsystem.
    Diag(String),
}

#[derive(Default)]
struct DiagLines(Vec<Output>);

impl DiagnosticSink for DiagLines {
    fn emit(&mut self, line: &str) {
        self.0.push(Output::Diag(line.to_owned()));
    }
}

pub struct Session {
    sim: Simulator,
    diag: DiagSwitch,
}

impl Session {
    pub fn new() -> Self {
        Self {
            sim: Simulator::new(),
            diag: DiagSwitch::default(),
        }
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<Output> {
        let trimmed = line.trim();
        let mut words = trimmed.split_whitespace();
        let head = words.next().unwrap_or("");
        let arg = words.next();
        let extra = words.next();

        if head.eq_ignore_ascii_case("run") {
            return match (arg.and_then(|value| value.parse::<u32>().ok()), extra) {
                (Some(ms), None) => self.run(ms),
                _ => usage("run <ms>"),
            };
        }
        if head.eq_ignore_ascii_case("fan") {
            return match (arg.and_then(|value| value.parse::<u32>().ok()), extra) {
                (Some(rpm), None) => {
                    self.sim.set_fan_rpm(rpm);
                    console(format!("OK: fan {rpm} rpm"))
                }
                _ => usage("fan <rpm>"),
            };
        }
        if head.eq_ignore_ascii_case("noise") {
            return match (arg.map(str::to_ascii_lowercase).as_deref(), extra) {
                (Some("on"), None) => self.noise(true),
                (Some("off"), None) => self.noise(false),
                _ => usage("noise on|off"),
            };
        }
        if head.eq_ignore_ascii_case("scope") && arg.is_none() {
            let scope = self.sim.take_scope();
            return console(format!(
                "scope bursts={} last_pulses={} last_tail_us={}",
                scope.bursts, scope.last_pulses, scope.last_tail_us
            ));
        }

        self.console_line(trimmed)
    }

    fn run(&mut self, ms: u32) -> Vec<Output> {
        let mut diag = DiagLines::default();
        self.sim.run_for(ms, &mut Gated::new(&mut diag, &self.diag));
        let mut lines = diag.0;
        lines.push(Output::Console(format!("t={} ms", self.sim.millis())));
        lines
    }

    fn noise(&mut self, enabled: bool) -> Vec<Output> {
        self.sim.set_noise(enabled);
        console(format!("OK: noise {}", if enabled { "on" } else { "off" }))
    }

    fn console_line(&mut self, line: &str) -> Vec<Output> {
        let duty = self.sim.duty();
        let now_ms = self.sim.millis();
        let mut diag = DiagLines::default();
        let mut executor = CommandExecutor::new(self.sim.controller_mut(), duty, &self.diag);
        let result = executor.execute(line, now_ms, &mut Gated::new(&mut diag, &self.diag));

        let mut text = String::new();
        if write_response(&mut text, &result, "\n").is_err() {
            text = String::from("ERROR: response formatting failed\n");
        }

        let mut lines = diag.0;
        lines.extend(text.lines().map(|line| Output::Console(line.to_owned())));
        match result {
            Ok(CommandOutcome::Help(None)) => {
                lines.push(Output::Console(String::from("Emulator commands:")));
                for (usage, summary) in EMULATOR_HELP {
                    lines.push(Output::Console(format!("  {usage:<16}{summary}")));
                }
            }
            Ok(CommandOutcome::Status(_)) => {
                lines.push(Output::Console(format!(
                    "sim t={} ms fan={} rpm noise={}",
                    now_ms,
                    self.sim.fan_rpm(),
                    if self.sim.noise() { "on" } else { "off" }
                )));
            }
            _ => {}
        }
        lines
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn console(line: String) -> Vec<Output> {
    vec![Output::Console(line)]
}

fn usage(text: &str) -> Vec<Output> {
    console(format!("ERROR: invalid argument. Use: {text}"))
}
