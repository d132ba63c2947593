//! Console tooling shared between firmware and emulator targets.
//!
//! Lines are assembled by [`line`], parsed by [`grammar`] against the
//! [`catalog`], executed by [`commands`] and rendered by [`status`].

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod line;
pub mod status;

/// Banner printed when the console comes up.
pub const BANNER: &str = "PWM Ready. Enter command: PSYN n  (n = 5..96)";

/// Prompt printed before each line.
pub const PROMPT: &str = "> ";
