//! Operator console session over a byte stream.
//!
//! The UART task feeds received bytes one at a time; everything the operator
//! should see (echo, erase sequences, responses, the prompt) is appended to a
//! bounded reply buffer that the task then writes out.

use core::fmt::{self, Write};

use tach_core::console::commands::{CommandError, CommandOutcome};
use tach_core::console::line::{LineBuffer, LineEvent};
use tach_core::console::status::write_response;
use tach_core::console::{BANNER, PROMPT};

pub const EOL: &str = "\r\n";

/// Fits the full `HELP` listing.
pub const REPLY_CAPACITY: usize = 512;

pub type Reply = heapless::String<REPLY_CAPACITY>;

const ERASE: &str = "\x08 \x08";

pub struct ConsoleSession {
    line: LineBuffer,
}

impl ConsoleSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
        }
    }

    /// Banner and first prompt.
    pub fn greet(out: &mut Reply) -> fmt::Result {
        write!(out, "{BANNER}{EOL}{PROMPT}")
    }

    /// Handles one received byte. `execute` runs once per completed line.
    pub fn feed<F>(&mut self, byte: u8, out: &mut Reply, execute: F) -> fmt::Result
    where
        F: FnOnce(&str) -> Result<CommandOutcome, CommandError>,
    {
        match self.line.feed(byte) {
            Ok(LineEvent::Echo(echo)) => out.write_char(char::from(echo)),
            Ok(LineEvent::Erased) => out.write_str(ERASE),
            Ok(LineEvent::Killed(count)) => {
                for _ in 0..count {
                    out.write_str(ERASE)?;
                }
                Ok(())
            }
            Ok(LineEvent::Ignored) => Ok(()),
            Ok(LineEvent::Complete(line)) => {
                out.write_str(EOL)?;
                let result = execute(line);
                write_response(out, &result, EOL)?;
                out.write_str(PROMPT)
            }
            Err(error) => write!(out, "{EOL}ERROR: {error}{EOL}{PROMPT}"),
        }
    }
}

impl Default for ConsoleSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tach_core::console::grammar::ParseError;

    fn feed_str<F>(session: &mut ConsoleSession, input: &[u8], mut execute: F) -> Reply
    where
        F: FnMut(&str) -> Result<CommandOutcome, CommandError>,
    {
        let mut out = Reply::new();
        for &byte in input {
            session
                .feed(byte, &mut out, &mut execute)
                .expect("reply fits");
        }
        out
    }

    #[test]
    fn greeting_ends_with_prompt() {
        let mut out = Reply::new();
        ConsoleSession::greet(&mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "PWM Ready. Enter command: PSYN n  (n = 5..96)\r\n> "
        );
    }

    #[test]
    fn completed_line_is_echoed_and_answered() {
        let mut session = ConsoleSession::new();
        let mut seen = heapless::Vec::<heapless::String<16>, 2>::new();

        let out = feed_str(&mut session, b"psyn 4\x7f45\r\n", |line| {
            seen.push(heapless::String::try_from(line).unwrap()).unwrap();
            Ok(CommandOutcome::DutySet(45))
        });

        assert_eq!(seen.as_slice(), ["psyn 45"]);
        assert_eq!(
            out.as_str(),
            "psyn 4\x08 \x0845\r\nOK: duty set to 45%\r\n> "
        );
    }

    #[test]
    fn ctrl_u_erases_every_typed_byte() {
        let mut session = ConsoleSession::new();
        let out = feed_str(&mut session, b"psy\x15HELP\r", |line| {
            assert_eq!(line, "HELP");
            Ok(CommandOutcome::Idle)
        });
        assert_eq!(
            out.as_str(),
            "psy\x08 \x08\x08 \x08\x08 \x08HELP\r\n> "
        );
    }

    #[test]
    fn errors_are_reported_and_prompt_returns() {
        let mut session = ConsoleSession::new();
        let out = feed_str(&mut session, b"FOO\r", |_| {
            Err(CommandError::Parse(ParseError::UnknownCommand))
        });
        assert_eq!(
            out.as_str(),
            "FOO\r\nERROR: unknown command. Type HELP\r\n> "
        );
    }

    #[test]
    fn blank_line_only_reprints_prompt() {
        let mut session = ConsoleSession::new();
        let out = feed_str(&mut session, b"\r", |_| Ok(CommandOutcome::Idle));
        assert_eq!(out.as_str(), "\r\n> ");
    }

    #[test]
    fn overflow_is_reported_once() {
        let mut session = ConsoleSession::new();
        let mut input = [b'x'; 100];
        input[99] = b'\r';

        let out = feed_str(&mut session, &input, |_| {
            panic!("overflowed line must not execute")
        });

        assert!(out.ends_with("\r\nERROR: line too long (max 96)\r\n> "));
        assert_eq!(out.matches("ERROR").count(), 1);
    }
}
