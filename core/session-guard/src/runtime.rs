//! Scheduler drivers for a `SessionGuard`.
//!
//! - `advance_to`: virtual time, for `ManualClock` (tests, simulation).
//! - `run_event_loop`: real time, single-threaded, fed through an mpsc channel.
//!
//! Both only ever call into the guard from one thread; producers of
//! commands may live on other threads.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use tracing::{debug, info};

use crate::clock::{Clock, ManualClock};
use crate::guard::SessionGuard;
use crate::machine::Transition;
use crate::monitor::ActivityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum GuardCommand {
    Activity(ActivityKind),
    StayLoggedIn,
    LogOutNow,
    ModalOpened,
    ModalClosed,
    SetEnabled(bool),
    Authenticate,
    EndSession,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    LoggedOut,
    Shutdown,
    Disconnected,
}

impl<C: Clock> SessionGuard<C> {
    /// Dispatches one command and returns the transitions it caused,
    /// preceded by any deadline that was already overdue when it arrived.
    ///
    /// `Shutdown` only tears down; stopping the loop is the caller's job.
    pub fn apply(&mut self, command: GuardCommand) -> Vec<Transition> {
        let mut transitions = self.poll();
        transitions.extend(self.dispatch(command));
        transitions
    }

    fn dispatch(&mut self, command: GuardCommand) -> Vec<Transition> {
        match command {
            GuardCommand::Activity(kind) => self.record_activity(kind).into_iter().collect(),
            GuardCommand::StayLoggedIn => self.stay_logged_in().into_iter().collect(),
            GuardCommand::LogOutNow => self.log_out_now().into_iter().collect(),
            GuardCommand::ModalOpened => self.set_modal_open(true),
            GuardCommand::ModalClosed => self.set_modal_open(false),
            GuardCommand::SetEnabled(enabled) => self.set_enabled(enabled).into_iter().collect(),
            GuardCommand::Authenticate => self.authenticate().into_iter().collect(),
            GuardCommand::EndSession => {
                self.end_session();
                Vec::new()
            }
            GuardCommand::Shutdown => {
                self.teardown();
                Vec::new()
            }
        }
    }
}

/// Moves a manual clock forward to `target_ms`, stopping at every deadline
/// on the way so each transition fires at its own instant.
pub fn advance_to(
    guard: &mut SessionGuard<ManualClock>,
    target_ms: u64,
    mut on_transition: impl FnMut(&Transition),
) {
    while let Some(deadline) = guard.next_deadline_ms() {
        if deadline > target_ms || !guard.is_active() {
            break;
        }
        guard.clock().set(deadline);
        for transition in guard.poll() {
            on_transition(&transition);
        }
    }
    guard.clock().set(target_ms);
}

/// Runs the guard against the wall clock until logout, shutdown, or the
/// command channel closing.
pub fn run_event_loop<C: Clock>(
    guard: &mut SessionGuard<C>,
    commands: &Receiver<GuardCommand>,
    mut on_transition: impl FnMut(&Transition),
) -> RunOutcome {
    loop {
        let received = match guard.time_until_next_deadline() {
            Some(wait) => commands.recv_timeout(wait),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let transitions = match received {
            Ok(GuardCommand::Shutdown) => {
                guard.teardown();
                info!("Guard event loop shut down");
                return RunOutcome::Shutdown;
            }
            Ok(command) => {
                debug!(?command, "Guard command received");
                let mut transitions = guard.poll();
                if !transitions.iter().any(Transition::is_logout) {
                    transitions.extend(guard.apply(command));
                    transitions.extend(guard.poll());
                }
                transitions
            }
            Err(RecvTimeoutError::Timeout) => guard.poll(),
            Err(RecvTimeoutError::Disconnected) => {
                guard.teardown();
                debug!("Guard command channel closed");
                return RunOutcome::Disconnected;
            }
        };

        for transition in &transitions {
            on_transition(transition);
        }
        if transitions.iter().any(Transition::is_logout) {
            return RunOutcome::LoggedOut;
        }
    }
}
