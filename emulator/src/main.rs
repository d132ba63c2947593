mod board;
mod session;
mod sim;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use crossterm::style::Stylize;
use session::{Output, Session};
use tach_core::console::{BANNER, PROMPT};

fn main() -> io::Result<()> {
    let fan_rpm = parse_fan_rpm().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: tach-emulator [--fan <rpm>]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new();
    let mut line = String::new();

    if let Some(rpm) = fan_rpm {
        session.handle_command(&format!("fan {rpm}"));
    }

    writeln!(writer, "{BANNER}")?;
    writeln!(
        writer,
        "Fan tach emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "{PROMPT}")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for output in session.handle_command(trimmed) {
            match output {
                Output::Console(text) => writeln!(writer, "{text}")?,
                Output::Diag(text) => writeln!(writer, "{}", text.dark_cyan())?,
            }
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_fan_rpm() -> Result<Option<u32>, String> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(None);
    };
    let value = if let Some(value) = arg.strip_prefix("--fan=") {
        value.to_string()
    } else if arg == "--fan" {
        args.next()
            .ok_or_else(|| "Expected value after --fan".to_string())?
    } else {
        return Err(format!("Unknown argument `{arg}`"));
    };
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("Invalid fan speed `{value}`"))
}
