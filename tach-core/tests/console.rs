mod support;

use support::{Log, RecordingSink, controller};
use tach_core::capture::PulseAccumulator;
use tach_core::console::catalog::{self, CommandTag};
use tach_core::console::commands::{CommandError, CommandExecutor, CommandOutcome};
use tach_core::console::grammar::ParseError;
use tach_core::console::status::write_response;
use tach_core::diag::{DiagSwitch, DiagnosticSink, Gated};
use tach_core::duty::{DutyCommand, DutyOutOfRange};
use tach_core::pin::PinRole;

fn respond(result: &Result<CommandOutcome, CommandError>) -> String {
    let mut out = String::new();
    write_response(&mut out, result, "\r\n").expect("string writes never fail");
    out
}

#[test]
fn psyn_updates_duty_within_range() {
    let pulses = PulseAccumulator::new();
    let log = Log::default();
    let mut sink = RecordingSink::default();
    let mut tach = controller(&pulses, &log);
    let duty = DutyCommand::default();
    let diag = DiagSwitch::default();
    let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);

    let result = executor.execute("psyn 40", 0, &mut sink);
    assert_eq!(result, Ok(CommandOutcome::DutySet(40)));
    assert_eq!(respond(&result), "OK: duty set to 40%\r\n");
    assert_eq!(duty.percent(), 40);

    let result = executor.execute("PSYN 97", 0, &mut sink);
    assert_eq!(result, Err(CommandError::Duty(DutyOutOfRange(97))));
    assert_eq!(respond(&result), "ERROR: value out of range (5..96)\r\n");
    assert_eq!(duty.percent(), 40);

    let result = executor.execute("PSYN", 0, &mut sink);
    assert_eq!(
        respond(&result),
        "ERROR: missing value. Use: PSYN n  (n=5..96)\r\n"
    );

    let result = executor.execute("PSYN 4O", 0, &mut sink);
    assert_eq!(respond(&result), "ERROR: invalid number. Use: PSYN n\r\n");
}

#[test]
fn tachin_on_prints_banner_through_sink() {
    let pulses = PulseAccumulator::new();
    let log = Log::default();
    let mut sink = RecordingSink::default();
    let mut tach = controller(&pulses, &log);
    let duty = DutyCommand::default();
    let diag = DiagSwitch::default();
    let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);

    let result = executor.execute("TACHIN ON", 250, &mut sink);

    assert_eq!(respond(&result), "OK: TACHIN ON\r\n");
    assert_eq!(sink.lines.len(), 1);
    assert!(sink.lines[0].starts_with("TACHIN ON: gpio_base=0x50000000"));
    drop(executor);
    assert!(tach.is_reporting_enabled());
    assert_eq!(tach.capture().next_report_ms(), 750);
}

#[test]
fn tsyn_and_tachcap_swap_pin_owner() {
    let pulses = PulseAccumulator::new();
    let log = Log::default();
    let mut sink = RecordingSink::default();
    let mut tach = controller(&pulses, &log);
    let duty = DutyCommand::default();
    let diag = DiagSwitch::default();
    let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);

    assert_eq!(
        executor.execute("tsyn on", 0, &mut sink),
        Ok(CommandOutcome::Synth(true))
    );
    let Ok(CommandOutcome::Status(snapshot)) = executor.execute("STATUS", 0, &mut sink) else {
        panic!("STATUS should succeed");
    };
    assert_eq!(snapshot.duty_percent, 30);
    assert_eq!(snapshot.tach.pin_owner, PinRole::Synth);
    assert!(snapshot.tach.synth_enabled);
    assert!(!snapshot.tach.capture_enabled);

    assert_eq!(
        executor.execute("TACHCAP ON", 0, &mut sink),
        Ok(CommandOutcome::Capture(true))
    );
    let status = executor.tach().status();
    assert_eq!(status.pin_owner, PinRole::Capture);
    assert!(!status.synth_enabled);
}

#[test]
fn blank_lines_and_unknown_commands() {
    let pulses = PulseAccumulator::new();
    let log = Log::default();
    let mut sink = RecordingSink::default();
    let mut tach = controller(&pulses, &log);
    let duty = DutyCommand::default();
    let diag = DiagSwitch::default();
    let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);

    let result = executor.execute("  ", 0, &mut sink);
    assert_eq!(result, Ok(CommandOutcome::Idle));
    assert_eq!(respond(&result), "");

    let result = executor.execute("FAN ON", 0, &mut sink);
    assert_eq!(
        result,
        Err(CommandError::Parse(ParseError::UnknownCommand))
    );
    assert_eq!(respond(&result), "ERROR: unknown command. Type HELP\r\n");
}

#[test]
fn help_for_single_topic() {
    let pulses = PulseAccumulator::new();
    let log = Log::default();
    let mut sink = RecordingSink::default();
    let mut tach = controller(&pulses, &log);
    let duty = DutyCommand::default();
    let diag = DiagSwitch::default();
    let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);

    let result = executor.execute("help tsyn", 0, &mut sink);

    assert_eq!(
        result,
        Ok(CommandOutcome::Help(Some(catalog::command(CommandTag::TSyn))))
    );
    assert_eq!(
        respond(&result),
        "  TSYN ON|OFF     Synthesize tach bursts on the tach pin\r\n"
    );
}

#[test]
fn debug_off_silences_the_diagnostic_stream() {
    let pulses = PulseAccumulator::new();
    let log = Log::default();
    let mut lines = RecordingSink::default();
    let mut tach = controller(&pulses, &log);
    let duty = DutyCommand::default();
    let diag = DiagSwitch::default();

    {
        let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);
        let mut sink = Gated::new(&mut lines, &diag);

        let result = executor.execute("debug off", 0, &mut sink);
        assert_eq!(result, Ok(CommandOutcome::Debug(false)));
        assert_eq!(respond(&result), "OK: DEBUG OFF\r\n");
        assert!(!diag.is_enabled());

        executor.execute("TACHIN ON", 0, &mut sink).expect("TACHIN ON");
        sink.emit("TACH pulses=0 rejects=0 rpm=0");
    }
    assert!(lines.lines.is_empty());

    {
        let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);
        let mut sink = Gated::new(&mut lines, &diag);
        assert_eq!(
            respond(&executor.execute("DEBUG ON", 0, &mut sink)),
            "OK: DEBUG ON\r\n"
        );
        sink.emit("TACH pulses=0 rejects=0 rpm=0");
    }
    assert_eq!(lines.lines, ["TACH pulses=0 rejects=0 rpm=0"]);

    let mut executor = CommandExecutor::new(&mut tach, &duty, &diag);
    assert_eq!(
        respond(&executor.execute("DEBUG", 0, &mut lines)),
        "ERROR: invalid argument. Use: DEBUG ON|OFF\r\n"
    );
}
