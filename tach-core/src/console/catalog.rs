//! Console command catalog shared by the parser and `HELP`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Psyn,
    TachIn,
    TachCap,
    TSyn,
    Status,
    Debug,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

const COMMANDS: [CommandSpec; 7] = [
    CommandSpec {
        name: "PSYN",
        tag: CommandTag::Psyn,
        usage: "PSYN n",
        summary: "Set PWM duty (n=5..96)",
    },
    CommandSpec {
        name: "TACHIN",
        tag: CommandTag::TachIn,
        usage: "TACHIN ON|OFF",
        summary: "Periodic tach reports",
    },
    CommandSpec {
        name: "TACHCAP",
        tag: CommandTag::TachCap,
        usage: "TACHCAP ON|OFF",
        summary: "Tach edge capture (ON stops TSYN)",
    },
    CommandSpec {
        name: "TSYN",
        tag: CommandTag::TSyn,
        usage: "TSYN ON|OFF",
        summary: "Synthesize tach bursts on the tach pin",
    },
    CommandSpec {
        name: "STATUS",
        tag: CommandTag::Status,
        usage: "STATUS",
        summary: "Show duty and tach state",
    },
    CommandSpec {
        name: "DEBUG",
        tag: CommandTag::Debug,
        usage: "DEBUG ON|OFF",
        summary: "Diagnostic line output",
    },
    CommandSpec {
        name: "HELP",
        tag: CommandTag::Help,
        usage: "HELP [command]",
        summary: "This help",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Looks up a command by its tag.
#[must_use]
pub fn command(tag: CommandTag) -> &'static CommandSpec {
    match tag {
        CommandTag::Psyn => &COMMANDS[0],
        CommandTag::TachIn => &COMMANDS[1],
        CommandTag::TachCap => &COMMANDS[2],
        CommandTag::TSyn => &COMMANDS[3],
        CommandTag::Status => &COMMANDS[4],
        CommandTag::Debug => &COMMANDS[5],
        CommandTag::Help => &COMMANDS[6],
    }
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_index_their_own_entries() {
        for spec in commands() {
            assert_eq!(command(spec.tag), spec);
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(find("tsyn").map(|spec| spec.tag), Some(CommandTag::TSyn));
        assert_eq!(find("TachCap").map(|spec| spec.tag), Some(CommandTag::TachCap));
        assert_eq!(find("debug").map(|spec| spec.tag), Some(CommandTag::Debug));
        assert!(find("fan").is_none());
    }
}
