//! Timeout State Machine.
//!
//! `Idle -> WarningVisible -> LoggedOut`, with activity or "stay logged in"
//! restarting the cycle from zero.
//!
//! There is exactly one timer slot. While idle it holds the warning deadline;
//! once the warning is visible it holds the logout deadline, and the visible
//! countdown is derived from that deadline instead of a separate ticker:
//!
//! ```text
//! seconds_remaining = ceil((logout_at_ms - now_ms) / 1000)
//! ```
//!
//! The machine never reads a clock. Callers pass `now_ms` and ask for
//! `next_deadline_ms()` to know when to call `tick` again.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ceil_secs, SessionTimeoutConfig};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GuardState {
    Idle,
    WarningVisible { seconds_remaining: u64 },
    LoggedOut,
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardState::Idle => f.write_str("idle"),
            GuardState::WarningVisible { seconds_remaining } => {
                write!(f, "warning({})", seconds_remaining)
            }
            GuardState::LoggedOut => f.write_str("logged_out"),
        }
    }
}

/// What the warning dialog renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningView {
    pub is_warning_visible: bool,
    pub seconds_remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    SessionStarted,
    Activity,
    StayLoggedIn,
    WarningDelayElapsed,
    CountdownTick,
    GracePeriodElapsed,
    LogOutNow,
}

impl TransitionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionCause::SessionStarted => "session_started",
            TransitionCause::Activity => "activity",
            TransitionCause::StayLoggedIn => "stay_logged_in",
            TransitionCause::WarningDelayElapsed => "warning_delay_elapsed",
            TransitionCause::CountdownTick => "countdown_tick",
            TransitionCause::GracePeriodElapsed => "grace_period_elapsed",
            TransitionCause::LogOutNow => "log_out_now",
        }
    }
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub at_ms: u64,
    pub from: GuardState,
    pub to: GuardState,
    pub cause: TransitionCause,
}

impl Transition {
    pub fn is_logout(&self) -> bool {
        self.to == GuardState::LoggedOut
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Disarmed,
    Warning { due_ms: u64 },
    Grace { logout_at_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct TimeoutMachine {
    config: SessionTimeoutConfig,
    state: GuardState,
    timer: Timer,
    last_reset_ms: u64,
    modal_open: bool,
}

impl TimeoutMachine {
    pub fn new(config: SessionTimeoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: GuardState::Idle,
            timer: Timer::Disarmed,
            last_reset_ms: 0,
            modal_open: false,
        })
    }

    pub fn config(&self) -> &SessionTimeoutConfig {
        &self.config
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.timer != Timer::Disarmed
    }

    pub fn modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn view(&self) -> WarningView {
        match self.state {
            GuardState::WarningVisible { seconds_remaining } => WarningView {
                is_warning_visible: true,
                seconds_remaining,
            },
            GuardState::Idle | GuardState::LoggedOut => WarningView {
                is_warning_visible: false,
                seconds_remaining: 0,
            },
        }
    }

    /// Starts a fresh cycle, including after `LoggedOut` (a new session).
    pub fn arm(&mut self, now_ms: u64, cause: TransitionCause) -> Transition {
        let from = self.state;
        self.restart_cycle(now_ms);
        Transition {
            at_ms: now_ms,
            from,
            to: self.state,
            cause,
        }
    }

    /// Restarts the idle clock from zero. No-op once logged out.
    ///
    /// Returns a transition only when the visible state changed.
    pub fn reset(&mut self, now_ms: u64, cause: TransitionCause) -> Option<Transition> {
        if self.state == GuardState::LoggedOut {
            return None;
        }

        let from = self.state;
        self.restart_cycle(now_ms);
        (from != self.state).then_some(Transition {
            at_ms: now_ms,
            from,
            to: self.state,
            cause,
        })
    }

    /// Processes every deadline due at or before `now_ms`, oldest first.
    ///
    /// An overdue warning is shown at `now_ms`, never backdated; its grace
    /// period starts from there.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Transition> {
        let mut transitions = Vec::new();

        loop {
            match self.timer {
                Timer::Warning { due_ms } if due_ms <= now_ms => {
                    transitions.push(self.show_warning(now_ms));
                }
                Timer::Grace { logout_at_ms } if logout_at_ms <= now_ms => {
                    transitions.push(self.log_out(logout_at_ms, TransitionCause::GracePeriodElapsed));
                    break;
                }
                Timer::Grace { logout_at_ms } => {
                    if let Some(transition) = self.update_countdown(now_ms, logout_at_ms) {
                        transitions.push(transition);
                    }
                    break;
                }
                Timer::Warning { .. } | Timer::Disarmed => break,
            }
        }

        transitions
    }

    /// Logs out immediately. No-op once logged out.
    pub fn expire(&mut self, now_ms: u64, cause: TransitionCause) -> Option<Transition> {
        if self.state == GuardState::LoggedOut {
            return None;
        }
        Some(self.log_out(now_ms, cause))
    }

    /// Clears the timer slot. A visible warning is withdrawn.
    pub fn disarm(&mut self) {
        self.timer = Timer::Disarmed;
        if let GuardState::WarningVisible { .. } = self.state {
            self.state = GuardState::Idle;
        }
    }

    /// Switches between the normal and modal warning delay.
    ///
    /// A pending warning is re-derived from the last reset, so the idle time
    /// already accumulated still counts. If that deadline has already passed,
    /// the next `tick` shows the warning with its full countdown.
    pub fn set_modal_open(&mut self, open: bool) {
        if self.modal_open == open {
            return;
        }
        self.modal_open = open;

        if let Timer::Warning { .. } = self.timer {
            self.timer = Timer::Warning {
                due_ms: self.warning_due_from(self.last_reset_ms),
            };
        }
    }

    /// Earliest instant at which `tick` has something to do.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        match self.timer {
            Timer::Disarmed => None,
            Timer::Warning { due_ms } => Some(due_ms),
            Timer::Grace { logout_at_ms } => match self.state {
                GuardState::WarningVisible { seconds_remaining } if seconds_remaining > 1 => {
                    let next_step = (seconds_remaining - 1).saturating_mul(1_000);
                    Some(logout_at_ms.saturating_sub(next_step))
                }
                _ => Some(logout_at_ms),
            },
        }
    }

    fn restart_cycle(&mut self, now_ms: u64) {
        self.timer = Timer::Disarmed;
        self.state = GuardState::Idle;
        self.last_reset_ms = now_ms;
        self.timer = Timer::Warning {
            due_ms: self.warning_due_from(now_ms),
        };
    }

    fn warning_due_from(&self, reset_ms: u64) -> u64 {
        reset_ms.saturating_add(self.config.effective_warning_delay_ms(self.modal_open))
    }

    fn show_warning(&mut self, shown_at_ms: u64) -> Transition {
        let from = self.state;
        self.timer = Timer::Grace {
            logout_at_ms: shown_at_ms.saturating_add(self.config.grace_period_ms),
        };
        self.state = GuardState::WarningVisible {
            seconds_remaining: self.config.initial_countdown_secs(),
        };
        Transition {
            at_ms: shown_at_ms,
            from,
            to: self.state,
            cause: TransitionCause::WarningDelayElapsed,
        }
    }

    fn update_countdown(&mut self, now_ms: u64, logout_at_ms: u64) -> Option<Transition> {
        let GuardState::WarningVisible { seconds_remaining } = self.state else {
            return None;
        };
        let remaining = ceil_secs(logout_at_ms.saturating_sub(now_ms));
        if remaining >= seconds_remaining {
            return None;
        }

        let from = self.state;
        self.state = GuardState::WarningVisible {
            seconds_remaining: remaining,
        };
        Some(Transition {
            at_ms: now_ms,
            from,
            to: self.state,
            cause: TransitionCause::CountdownTick,
        })
    }

    fn log_out(&mut self, at_ms: u64, cause: TransitionCause) -> Transition {
        let from = self.state;
        self.timer = Timer::Disarmed;
        self.state = GuardState::LoggedOut;
        Transition {
            at_ms,
            from,
            to: self.state,
            cause,
        }
    }
}
