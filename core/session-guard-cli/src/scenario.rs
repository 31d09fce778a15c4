//! Deterministic timeline simulation.
//!
//! A scenario is a JSON document of timed steps replayed against a guard on a
//! `ManualClock`. Time jumps straight from deadline to deadline, so a
//! fifteen-minute timeline runs instantly.

use serde::{Deserialize, Serialize};
use session_guard::{
    advance_to, ActivityKind, GuardCommand, GuardConfig, GuardError, GuardState, ManualClock,
    SessionGuard, Transition, WarningView,
};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Step {index} at {at_ms}ms is earlier than the previous step at {previous_ms}ms")]
    OutOfOrder {
        index: usize,
        at_ms: u64,
        previous_ms: u64,
    },

    #[error("until_ms ({until_ms}) is earlier than the last step ({last_ms}ms)")]
    EndsBeforeLastStep { until_ms: u64, last_ms: u64 },

    #[error(transparent)]
    Guard(#[from] GuardError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub until_ms: u64,
    #[serde(default = "default_authenticated")]
    pub authenticated: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Activity { kind: ActivityKind },
    StayLoggedIn,
    LogOutNow,
    ModalOpened,
    ModalClosed,
    Enable,
    Disable,
    Authenticate,
    EndSession,
}

impl Action {
    pub fn command(self) -> GuardCommand {
        match self {
            Action::Activity { kind } => GuardCommand::Activity(kind),
            Action::StayLoggedIn => GuardCommand::StayLoggedIn,
            Action::LogOutNow => GuardCommand::LogOutNow,
            Action::ModalOpened => GuardCommand::ModalOpened,
            Action::ModalClosed => GuardCommand::ModalClosed,
            Action::Enable => GuardCommand::SetEnabled(true),
            Action::Disable => GuardCommand::SetEnabled(false),
            Action::Authenticate => GuardCommand::Authenticate,
            Action::EndSession => GuardCommand::EndSession,
        }
    }
}

fn default_authenticated() -> bool {
    true
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs_err::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Scenario =
            serde_json::from_str(&content).map_err(|source| ScenarioError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut previous_ms = 0;
        for (index, step) in self.steps.iter().enumerate() {
            if step.at_ms < previous_ms {
                return Err(ScenarioError::OutOfOrder {
                    index,
                    at_ms: step.at_ms,
                    previous_ms,
                });
            }
            previous_ms = step.at_ms;
        }

        if self.until_ms < previous_ms {
            return Err(ScenarioError::EndsBeforeLastStep {
                until_ms: self.until_ms,
                last_ms: previous_ms,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub ended_at_ms: u64,
    pub final_state: GuardState,
    pub view: WarningView,
    pub terminations: u32,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub transitions: Vec<Transition>,
    pub summary: SimulationSummary,
}

pub fn run(scenario: &Scenario, config: GuardConfig) -> Result<SimulationReport, ScenarioError> {
    scenario.validate()?;

    let clock = ManualClock::new();
    let terminations = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&terminations);
    let mut guard = SessionGuard::new(config, clock.clone(), move || {
        counter.set(counter.get() + 1);
        info!(count = counter.get(), "Session terminated");
    })?;

    let mut transitions = Vec::new();
    let mut record = |transition: &Transition| transitions.push(*transition);

    if scenario.authenticated {
        if let Some(transition) = guard.authenticate() {
            record(&transition);
        }
    }

    for step in &scenario.steps {
        advance_to(&mut guard, step.at_ms, &mut record);
        for transition in guard.apply(step.action.command()) {
            record(&transition);
        }
    }
    advance_to(&mut guard, scenario.until_ms, &mut record);

    let summary = SimulationSummary {
        ended_at_ms: scenario.until_ms,
        final_state: guard.state(),
        view: guard.view(),
        terminations: terminations.get(),
    };

    Ok(SimulationReport {
        transitions,
        summary,
    })
}
