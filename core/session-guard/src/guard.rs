//! Session Guard: the controller a session owner constructs and drives.
//!
//! Owns the clock, the activity monitor, the timeout machine, and the
//! session terminator. A guard is active only while the user is
//! authenticated and the feature is enabled; otherwise every timer is
//! cleared and signals are ignored.

use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::GuardConfig;
use crate::error::Result;
use crate::machine::{GuardState, TimeoutMachine, Transition, TransitionCause, WarningView};
use crate::monitor::{ActivityKind, ActivityMonitor};

/// Ends the authenticated session (clears credentials, redirects).
///
/// Called exactly once per logout. The guard does not observe the outcome.
pub trait SessionTerminator {
    fn terminate_session(&mut self);
}

impl<F> SessionTerminator for F
where
    F: FnMut(),
{
    fn terminate_session(&mut self) {
        self()
    }
}

pub struct SessionGuard<C: Clock> {
    clock: C,
    machine: TimeoutMachine,
    monitor: ActivityMonitor,
    terminator: Box<dyn SessionTerminator>,
    authenticated: bool,
    enabled: bool,
}

impl<C: Clock> SessionGuard<C> {
    pub fn new(
        config: GuardConfig,
        clock: C,
        terminator: impl SessionTerminator + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let enabled = config.session_timeout.enabled;
        Ok(Self {
            clock,
            machine: TimeoutMachine::new(config.session_timeout)?,
            monitor: ActivityMonitor::new(config.monitor.throttle_ms),
            terminator: Box::new(terminator),
            authenticated: false,
            enabled,
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> GuardState {
        self.machine.state()
    }

    pub fn view(&self) -> WarningView {
        self.machine.view()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_active(&self) -> bool {
        self.authenticated && self.enabled
    }

    pub fn is_armed(&self) -> bool {
        self.machine.is_armed()
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.machine.next_deadline_ms()
    }

    /// How long the scheduler may sleep before calling `poll`.
    pub fn time_until_next_deadline(&self) -> Option<Duration> {
        self.next_deadline_ms().map(|deadline| {
            Duration::from_millis(deadline.saturating_sub(self.clock.now_ms()))
        })
    }

    /// The user has signed in. Starts a fresh cycle if the guard is enabled.
    pub fn authenticate(&mut self) -> Option<Transition> {
        self.authenticated = true;
        if !self.enabled {
            debug!("Session authenticated; guard disabled, not arming");
            return None;
        }
        Some(self.start_cycle())
    }

    /// Authentication ended elsewhere. Tears down without calling the terminator.
    pub fn end_session(&mut self) {
        self.authenticated = false;
        self.teardown();
        debug!("Session ended; guard torn down");
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Option<Transition> {
        if self.enabled == enabled {
            return None;
        }
        self.enabled = enabled;

        if !enabled {
            self.teardown();
            info!("Session guard disabled");
            return None;
        }

        info!("Session guard enabled");
        if self.authenticated {
            Some(self.start_cycle())
        } else {
            None
        }
    }

    pub fn set_modal_open(&mut self, open: bool) -> Vec<Transition> {
        self.machine.set_modal_open(open);
        debug!(modal_open = open, "Modal state changed");
        self.poll()
    }

    /// Feeds one interaction signal through the activity throttle.
    ///
    /// Overdue deadlines fire first: a signal arriving after the logout
    /// deadline does not revive the session.
    pub fn record_activity(&mut self, kind: ActivityKind) -> Option<Transition> {
        self.poll();
        if !self.is_active() || self.machine.state() == GuardState::LoggedOut {
            return None;
        }

        let now_ms = self.clock.now_ms();
        if !self.monitor.observe(kind, now_ms) {
            return None;
        }

        debug!(kind = %kind, at_ms = now_ms, "Activity resets idle timer");
        let transition = self.machine.reset(now_ms, TransitionCause::Activity);
        if let Some(transition) = &transition {
            self.log_transition(transition);
        }
        transition
    }

    /// "Stay logged in" from the warning dialog: full restart from zero.
    pub fn stay_logged_in(&mut self) -> Option<Transition> {
        self.poll();
        if !self.is_active() {
            return None;
        }

        let now_ms = self.clock.now_ms();
        let transition = self.machine.reset(now_ms, TransitionCause::StayLoggedIn);
        if let Some(transition) = &transition {
            self.log_transition(transition);
        }
        transition
    }

    /// "Log out now" from the warning dialog: skip the rest of the grace period.
    pub fn log_out_now(&mut self) -> Option<Transition> {
        self.poll();
        if !self.is_active() {
            return None;
        }

        let now_ms = self.clock.now_ms();
        let transition = self.machine.expire(now_ms, TransitionCause::LogOutNow)?;
        self.finish(&transition);
        Some(transition)
    }

    /// Scheduler entry point: fires every deadline that is due.
    pub fn poll(&mut self) -> Vec<Transition> {
        if !self.is_active() {
            return Vec::new();
        }

        let transitions = self.machine.tick(self.clock.now_ms());
        for transition in &transitions {
            self.finish(transition);
        }
        transitions
    }

    /// Clears every timer. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.machine.disarm();
        self.monitor.clear();
    }

    fn start_cycle(&mut self) -> Transition {
        self.monitor.clear();
        let transition = self
            .machine
            .arm(self.clock.now_ms(), TransitionCause::SessionStarted);
        self.log_transition(&transition);
        transition
    }

    fn finish(&mut self, transition: &Transition) {
        self.log_transition(transition);
        if transition.is_logout() {
            self.authenticated = false;
            self.teardown();
            self.terminator.terminate_session();
        }
    }

    fn log_transition(&self, transition: &Transition) {
        match transition.cause {
            TransitionCause::CountdownTick | TransitionCause::Activity => debug!(
                at_ms = transition.at_ms,
                from = %transition.from,
                to = %transition.to,
                cause = %transition.cause,
                "Guard transition"
            ),
            _ => info!(
                at_ms = transition.at_ms,
                from = %transition.from,
                to = %transition.to,
                cause = %transition.cause,
                "Guard transition"
            ),
        }
    }
}

impl<C: Clock> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{MonitorConfig, SessionTimeoutConfig};
    use std::cell::Cell;
    use std::rc::Rc;

    fn config(warning_delay_ms: u64, grace_period_ms: u64) -> GuardConfig {
        GuardConfig {
            session_timeout: SessionTimeoutConfig {
                warning_delay_ms,
                grace_period_ms,
                enabled: true,
                activity_override_ms: None,
            },
            monitor: MonitorConfig { throttle_ms: 1_000 },
        }
    }

    fn guard_with_counter(config: GuardConfig) -> (SessionGuard<ManualClock>, ManualClock, Rc<Cell<u32>>) {
        let clock = ManualClock::new();
        let terminations = Rc::new(Cell::new(0));
        let counter = Rc::clone(&terminations);
        let guard = SessionGuard::new(config, clock.clone(), move || {
            counter.set(counter.get() + 1)
        })
        .expect("valid config");
        (guard, clock, terminations)
    }

    #[test]
    fn inactive_until_authenticated() {
        let (mut guard, clock, _) = guard_with_counter(config(5_000, 5_000));
        assert!(!guard.is_armed());
        assert!(guard.record_activity(ActivityKind::Click).is_none());
        clock.set(50_000);
        assert!(guard.poll().is_empty());
    }

    #[test]
    fn authenticate_arms_cycle() {
        let (mut guard, _, _) = guard_with_counter(config(5_000, 5_000));
        let transition = guard.authenticate().expect("session started");
        assert_eq!(transition.cause, TransitionCause::SessionStarted);
        assert_eq!(guard.next_deadline_ms(), Some(5_000));
        assert_eq!(guard.time_until_next_deadline(), Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn disabled_config_never_arms() {
        let mut disabled = config(5_000, 5_000);
        disabled.session_timeout.enabled = false;
        let (mut guard, clock, terminations) = guard_with_counter(disabled);
        assert!(guard.authenticate().is_none());
        clock.set(60_000);
        assert!(guard.poll().is_empty());
        assert_eq!(terminations.get(), 0);
    }

    #[test]
    fn logout_invokes_terminator_once_and_ends_session() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        clock.set(10_000);
        let transitions = guard.poll();
        assert!(transitions.last().is_some_and(Transition::is_logout));
        assert_eq!(terminations.get(), 1);
        assert!(!guard.is_authenticated());
        assert!(!guard.is_armed());

        clock.set(20_000);
        assert!(guard.poll().is_empty());
        assert!(guard.record_activity(ActivityKind::KeyDown).is_none());
        assert!(guard.log_out_now().is_none());
        assert_eq!(terminations.get(), 1);
    }

    #[test]
    fn throttled_activity_does_not_reset() {
        let (mut guard, clock, _) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(100);
        guard.record_activity(ActivityKind::PointerMove);
        assert_eq!(guard.next_deadline_ms(), Some(5_100));
        clock.set(600);
        guard.record_activity(ActivityKind::PointerMove);
        assert_eq!(guard.next_deadline_ms(), Some(5_100));
        clock.set(1_100);
        guard.record_activity(ActivityKind::PointerMove);
        assert_eq!(guard.next_deadline_ms(), Some(6_100));
    }

    #[test]
    fn stay_logged_in_bypasses_throttle() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        guard.record_activity(ActivityKind::Click);
        clock.set(5_200);
        guard.poll();
        assert_eq!(guard.state(), GuardState::Idle);

        clock.set(10_200);
        guard.poll();
        assert!(guard.view().is_warning_visible);
        let transition = guard.stay_logged_in().expect("dismissed");
        assert_eq!(transition.cause, TransitionCause::StayLoggedIn);
        assert_eq!(guard.next_deadline_ms(), Some(15_200));
        assert_eq!(terminations.get(), 0);
    }

    #[test]
    fn log_out_now_terminates_immediately() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        clock.set(5_400);
        let transition = guard.log_out_now().expect("logout");
        assert_eq!(transition.at_ms, 5_400);
        assert_eq!(guard.state(), GuardState::LoggedOut);
        assert_eq!(terminations.get(), 1);

        clock.set(10_000);
        assert!(guard.poll().is_empty());
        assert_eq!(terminations.get(), 1);
    }

    #[test]
    fn disabling_clears_timers_and_ignores_signals() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        assert!(guard.set_enabled(false).is_none());
        assert!(!guard.is_armed());
        assert!(!guard.view().is_warning_visible);

        clock.set(60_000);
        assert!(guard.poll().is_empty());
        assert!(guard.record_activity(ActivityKind::Scroll).is_none());
        assert!(guard.stay_logged_in().is_none());
        assert_eq!(terminations.get(), 0);

        let restarted = guard.set_enabled(true).expect("fresh cycle");
        assert_eq!(restarted.cause, TransitionCause::SessionStarted);
        assert_eq!(guard.next_deadline_ms(), Some(65_000));
    }

    #[test]
    fn end_session_tears_down_without_terminator() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        guard.end_session();
        clock.set(60_000);
        assert!(guard.poll().is_empty());
        assert_eq!(terminations.get(), 0);
    }

    #[test]
    fn reauthenticate_after_logout_starts_new_cycle() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        clock.set(10_000);
        guard.poll();
        assert_eq!(terminations.get(), 1);

        clock.set(30_000);
        let transition = guard.authenticate().expect("new session");
        assert_eq!(transition.from, GuardState::LoggedOut);
        assert_eq!(guard.state(), GuardState::Idle);
        assert_eq!(guard.next_deadline_ms(), Some(35_000));
    }

    #[test]
    fn modal_override_extends_warning_delay() {
        let mut with_override = config(5_000, 5_000);
        with_override.session_timeout.activity_override_ms = Some(30_000);
        let (mut guard, clock, _) = guard_with_counter(with_override);
        guard.authenticate();
        clock.set(2_000);
        assert!(guard.set_modal_open(true).is_empty());
        clock.set(6_000);
        assert!(guard.poll().is_empty());
        assert_eq!(guard.next_deadline_ms(), Some(30_000));
    }

    #[test]
    fn closing_modal_after_long_idle_warns_with_full_countdown() {
        for closed_at in [8_000u64, 12_000] {
            let mut with_override = config(5_000, 5_000);
            with_override.session_timeout.activity_override_ms = Some(30_000);
            let (mut guard, clock, terminations) = guard_with_counter(with_override);
            guard.authenticate();
            guard.set_modal_open(true);
            clock.set(closed_at);

            let transitions = guard.set_modal_open(false);
            assert_eq!(transitions.len(), 1);
            assert_eq!(transitions[0].cause, TransitionCause::WarningDelayElapsed);
            assert_eq!(transitions[0].at_ms, closed_at);
            assert_eq!(
                guard.view(),
                WarningView {
                    is_warning_visible: true,
                    seconds_remaining: 5
                }
            );
            assert_eq!(terminations.get(), 0);
            assert_eq!(guard.next_deadline_ms(), Some(closed_at + 1_000));
        }
    }

    #[test]
    fn signals_after_logout_deadline_do_not_revive_session() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        clock.set(10_500);

        assert!(guard.stay_logged_in().is_none());
        assert_eq!(guard.state(), GuardState::LoggedOut);
        assert_eq!(terminations.get(), 1);
        assert!(!guard.is_authenticated());

        assert!(guard.record_activity(ActivityKind::Click).is_none());
        assert!(guard.log_out_now().is_none());
        assert_eq!(terminations.get(), 1);
    }

    #[test]
    fn activity_after_logout_deadline_terminates_once() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(7_000);
        guard.poll();
        clock.set(30_000);

        assert!(guard.record_activity(ActivityKind::KeyDown).is_none());
        assert_eq!(guard.state(), GuardState::LoggedOut);
        assert_eq!(terminations.get(), 1);
    }

    #[test]
    fn stay_logged_in_before_logout_deadline_still_dismisses() {
        let (mut guard, clock, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        clock.set(5_000);
        guard.poll();
        clock.set(9_999);

        let transition = guard.stay_logged_in().expect("dismissed");
        assert_eq!(transition.to, GuardState::Idle);
        assert_eq!(terminations.get(), 0);
        assert_eq!(guard.next_deadline_ms(), Some(14_999));
    }

    #[test]
    fn drop_tears_down() {
        let (mut guard, _, terminations) = guard_with_counter(config(5_000, 5_000));
        guard.authenticate();
        drop(guard);
        assert_eq!(terminations.get(), 0);
    }
}
