//! Transition records for JSON-lines output and one-line text logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::machine::{GuardState, Transition, TransitionCause, WarningView};

/// A transition as written to JSON-lines output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub from: GuardState,
    pub to: GuardState,
    pub cause: TransitionCause,
    pub view: WarningView,
}

impl TransitionRecord {
    pub fn from_transition(transition: &Transition) -> Self {
        let view = match transition.to {
            GuardState::WarningVisible { seconds_remaining } => WarningView {
                is_warning_visible: true,
                seconds_remaining,
            },
            GuardState::Idle | GuardState::LoggedOut => WarningView {
                is_warning_visible: false,
                seconds_remaining: 0,
            },
        };

        Self {
            at_ms: transition.at_ms,
            recorded_at: None,
            from: transition.from,
            to: transition.to,
            cause: transition.cause,
            view,
        }
    }

    pub fn with_recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }

    pub fn to_json_line(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("Failed to serialize transition: {}", e))
    }
}

pub fn format_transition(transition: &Transition) -> String {
    format!(
        "GuardTransition at={}ms {} -> {} cause={}",
        transition.at_ms, transition.from, transition.to, transition.cause
    )
}
