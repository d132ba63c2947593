#![allow(clippy::module_name_repetitions)]

//! Parser for console command lines.
//!
//! A line is a case-insensitive keyword from the [`catalog`] followed by the
//! command's argument. Keyword and argument parsing use `winnow` combinators
//! over the raw `&str`; failures map onto the fixed error vocabulary the
//! console prints.

use core::fmt;

use winnow::ascii::{Caseless, digit1, space0, space1};
use winnow::combinator::{alt, eof, opt, peek, preceded, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use super::catalog::{self, CommandSpec, CommandTag};
use crate::duty::{PSYN_MAX, PSYN_MIN};

/// Structured commands produced by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requested duty, not yet range checked.
    Psyn(i32),
    TachIn(bool),
    TachCap(bool),
    TSyn(bool),
    Status,
    Debug(bool),
    Help(Option<&'static CommandSpec>),
}

/// Grammar errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line.
    Empty,
    UnknownCommand,
    /// `PSYN` without a value.
    MissingValue,
    /// `PSYN` with something that is not a decimal integer.
    InvalidNumber,
    /// Argument does not match the command's usage.
    Usage(CommandTag),
    UnknownTopic,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty line"),
            ParseError::UnknownCommand => f.write_str("unknown command. Type HELP"),
            ParseError::MissingValue => write!(
                f,
                "missing value. Use: PSYN n  (n={PSYN_MIN}..{PSYN_MAX})"
            ),
            ParseError::InvalidNumber => f.write_str("invalid number. Use: PSYN n"),
            ParseError::Usage(tag) => {
                write!(f, "invalid argument. Use: {}", catalog::command(*tag).usage)
            }
            ParseError::UnknownTopic => f.write_str("unknown help topic. Type HELP"),
        }
    }
}

/// Parse a console command from the provided line.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut input = line.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let name = command_word
        .parse_next(&mut input)
        .map_err(|_| ParseError::UnknownCommand)?;
    let spec = catalog::find(name).ok_or(ParseError::UnknownCommand)?;
    let usage = |_: ContextError| ParseError::Usage(spec.tag);

    match spec.tag {
        CommandTag::Psyn => psyn_value(&mut input).map(Command::Psyn),
        CommandTag::TachIn => switch.parse_next(&mut input).map(Command::TachIn).map_err(usage),
        CommandTag::TachCap => switch
            .parse_next(&mut input)
            .map(Command::TachCap)
            .map_err(usage),
        CommandTag::TSyn => switch.parse_next(&mut input).map(Command::TSyn).map_err(usage),
        CommandTag::Debug => switch.parse_next(&mut input).map(Command::Debug).map_err(usage),
        CommandTag::Status => end_of_line
            .parse_next(&mut input)
            .map(|()| Command::Status)
            .map_err(usage),
        CommandTag::Help => {
            let topic = help_topic.parse_next(&mut input).map_err(usage)?;
            match topic {
                None => Ok(Command::Help(None)),
                Some(name) => catalog::find(name)
                    .map(|spec| Command::Help(Some(spec)))
                    .ok_or(ParseError::UnknownTopic),
            }
        }
    }
}

fn keyword<'a>(input: &mut &'a str) -> Result<&'a str, ContextError> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric()).parse_next(input)
}

/// A keyword that ends at whitespace or the end of the line.
fn command_word<'a>(input: &mut &'a str) -> Result<&'a str, ContextError> {
    terminated(keyword, peek(alt((space1, eof)))).parse_next(input)
}

fn end_of_line(input: &mut &str) -> Result<(), ContextError> {
    (space0, eof).void().parse_next(input)
}

fn switch(input: &mut &str) -> Result<bool, ContextError> {
    preceded(
        space1,
        terminated(
            alt((Caseless("on").value(true), Caseless("off").value(false))),
            end_of_line,
        ),
    )
    .parse_next(input)
}

fn help_topic<'a>(input: &mut &'a str) -> Result<Option<&'a str>, ContextError> {
    terminated(opt(preceded(space1, keyword)), end_of_line).parse_next(input)
}

fn signed_decimal<'a>(input: &mut &'a str) -> Result<&'a str, ContextError> {
    terminated((opt(one_of(['+', '-'])), digit1).take(), end_of_line).parse_next(input)
}

fn psyn_value(input: &mut &str) -> Result<i32, ParseError> {
    let _ = space0::<_, ContextError>.parse_next(input);
    if input.is_empty() {
        return Err(ParseError::MissingValue);
    }

    let literal = signed_decimal
        .parse_next(input)
        .map_err(|_| ParseError::InvalidNumber)?;

    // Out-of-range magnitudes saturate so they surface as range errors.
    Ok(literal.parse::<i32>().unwrap_or(if literal.starts_with('-') {
        i32::MIN
    } else {
        i32::MAX
    }))
}
