//! Live guard driven by stdin.
//!
//! A reader thread turns each stdin line into a `GuardCommand`; the guard
//! itself only runs on the event loop thread.

use session_guard::{
    run_event_loop, GuardCommand, GuardConfig, RunOutcome, SessionGuard, SystemClock, Transition,
    TransitionRecord,
};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{info, warn};

pub fn parse_command(line: &str) -> Result<Option<GuardCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match (head, arg) {
        ("activity", Some(kind)) => GuardCommand::Activity(kind.parse()?),
        ("activity", None) => return Err("activity requires a kind".to_string()),
        ("stay", None) => GuardCommand::StayLoggedIn,
        ("logout", None) => GuardCommand::LogOutNow,
        ("modal", Some("open")) => GuardCommand::ModalOpened,
        ("modal", Some("close")) => GuardCommand::ModalClosed,
        ("enable", None) => GuardCommand::SetEnabled(true),
        ("disable", None) => GuardCommand::SetEnabled(false),
        ("login", None) => GuardCommand::Authenticate,
        ("end", None) => GuardCommand::EndSession,
        ("quit", None) => GuardCommand::Shutdown,
        (kind, None) => GuardCommand::Activity(
            kind.parse()
                .map_err(|_| format!("Unknown command: {}", line.trim()))?,
        ),
        _ => return Err(format!("Unknown command: {}", line.trim())),
    };

    if words.next().is_some() {
        return Err(format!("Unexpected arguments: {}", line.trim()));
    }
    Ok(Some(command))
}

pub fn run(config: GuardConfig) -> Result<RunOutcome, String> {
    let clock = SystemClock::new();
    let wall_clock = clock.clone();
    let mut guard = SessionGuard::new(config, clock, || {
        info!("Session terminated by inactivity guard");
    })?;

    let (sender, receiver) = mpsc::channel();
    spawn_stdin_reader(sender);

    info!(started_at = %wall_clock.started_at().to_rfc3339(), "Watching for activity on stdin");

    let stdout = io::stdout();
    let mut emit = |transition: &Transition| {
        let record = TransitionRecord::from_transition(transition)
            .with_recorded_at(wall_clock.wall_time(transition.at_ms));
        match record.to_json_line() {
            Ok(line) => {
                let mut out = stdout.lock();
                if let Err(err) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
                    warn!(error = %err, "Failed to write transition");
                }
            }
            Err(err) => warn!(error = %err, "Failed to encode transition"),
        }
    };

    if let Some(transition) = guard.authenticate() {
        emit(&transition);
    }

    let outcome = run_event_loop(&mut guard, &receiver, &mut emit);
    info!(?outcome, "Guard stopped");
    Ok(outcome)
}

fn spawn_stdin_reader(sender: Sender<GuardCommand>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "Failed to read stdin");
                    break;
                }
            };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Ignoring input line"),
            }
        }
    });
}
