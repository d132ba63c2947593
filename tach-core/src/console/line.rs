//! Byte-at-a-time console line assembly.

use core::fmt;
use core::str;

use heapless::Vec;

/// Longest accepted console line in bytes.
pub const MAX_LINE_LEN: usize = 96;

/// Ctrl-U.
const KILL_LINE: u8 = 0x15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineError {
    /// The line exceeded [`MAX_LINE_LEN`]; its remaining bytes are dropped.
    Overflow,
    InvalidUtf8,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Overflow => write!(f, "line too long (max {MAX_LINE_LEN})"),
            LineError::InvalidUtf8 => f.write_str("line is not valid UTF-8"),
        }
    }
}

/// What the caller should do after feeding one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// Byte stored; echo it back.
    Echo(u8),
    /// Last byte removed; echo an erase sequence.
    Erased,
    /// Ctrl-U cleared this many bytes; echo one erase sequence per byte.
    Killed(usize),
    /// Nothing to echo.
    Ignored,
    /// A full line, without its terminator.
    Complete(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Collecting,
    /// A line was just returned; clear before the next byte.
    Delivered,
    /// Overflowed; drop bytes until the next terminator.
    Discarding,
}

pub struct LineBuffer {
    bytes: Vec<u8, MAX_LINE_LEN>,
    state: State,
    after_cr: bool,
}

impl LineBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            state: State::Collecting,
            after_cr: false,
        }
    }

    /// Feeds one received byte. CR, LF and CR LF each end a line; backspace
    /// and DEL erase the previous byte; Ctrl-U erases the whole line.
    pub fn feed(&mut self, byte: u8) -> Result<LineEvent<'_>, LineError> {
        if self.state == State::Delivered {
            self.bytes.clear();
            self.state = State::Collecting;
        }

        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');

        match byte {
            b'\n' if after_cr => Ok(LineEvent::Ignored),
            b'\r' | b'\n' => {
                if self.state == State::Discarding {
                    self.bytes.clear();
                    self.state = State::Collecting;
                    return Ok(LineEvent::Ignored);
                }
                self.state = State::Delivered;
                str::from_utf8(&self.bytes)
                    .map(LineEvent::Complete)
                    .map_err(|_| LineError::InvalidUtf8)
            }
            _ if self.state == State::Discarding => Ok(LineEvent::Ignored),
            0x08 | 0x7f => Ok(match self.bytes.pop() {
                Some(_) => LineEvent::Erased,
                None => LineEvent::Ignored,
            }),
            KILL_LINE => {
                let erased = self.bytes.len();
                self.bytes.clear();
                Ok(if erased == 0 {
                    LineEvent::Ignored
                } else {
                    LineEvent::Killed(erased)
                })
            }
            value => {
                if self.bytes.push(value).is_err() {
                    self.bytes.clear();
                    self.state = State::Discarding;
                    return Err(LineError::Overflow);
                }
                Ok(LineEvent::Echo(value))
            }
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
