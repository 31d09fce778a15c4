//! Activity Monitor: collapses bursts of interaction signals into at most one
//! activity notification per throttle window.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PointerMove,
    PointerDown,
    KeyDown,
    KeyPress,
    Scroll,
    TouchStart,
    Wheel,
    Click,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 8] = [
        ActivityKind::PointerMove,
        ActivityKind::PointerDown,
        ActivityKind::KeyDown,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Wheel,
        ActivityKind::Click,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PointerMove => "pointer_move",
            ActivityKind::PointerDown => "pointer_down",
            ActivityKind::KeyDown => "key_down",
            ActivityKind::KeyPress => "key_press",
            ActivityKind::Scroll => "scroll",
            ActivityKind::TouchStart => "touch_start",
            ActivityKind::Wheel => "wheel",
            ActivityKind::Click => "click",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("Unknown activity kind: {}", value))
    }
}

#[derive(Debug, Clone)]
pub struct ActivityMonitor {
    throttle_ms: u64,
    window_ends_at_ms: Option<u64>,
}

impl ActivityMonitor {
    pub fn new(throttle_ms: u64) -> Self {
        Self {
            throttle_ms,
            window_ends_at_ms: None,
        }
    }

    /// Returns `true` when the signal should be forwarded as activity.
    pub fn observe(&mut self, kind: ActivityKind, now_ms: u64) -> bool {
        if let Some(ends_at) = self.window_ends_at_ms {
            if now_ms < ends_at {
                tracing::trace!(kind = %kind, now_ms, "Activity dropped inside throttle window");
                return false;
            }
        }

        self.window_ends_at_ms = Some(now_ms.saturating_add(self.throttle_ms));
        true
    }

    pub fn clear(&mut self) {
        self.window_ends_at_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_signal_is_emitted() {
        let mut monitor = ActivityMonitor::new(1_000);
        assert!(monitor.observe(ActivityKind::PointerMove, 0));
    }

    #[test]
    fn signals_inside_window_are_dropped() {
        let mut monitor = ActivityMonitor::new(1_000);
        assert!(monitor.observe(ActivityKind::KeyDown, 100));
        assert!(!monitor.observe(ActivityKind::KeyPress, 200));
        assert!(!monitor.observe(ActivityKind::Scroll, 1_099));
        assert!(monitor.observe(ActivityKind::Scroll, 1_100));
    }

    #[test]
    fn dropped_signals_do_not_extend_window() {
        let mut monitor = ActivityMonitor::new(1_000);
        assert!(monitor.observe(ActivityKind::Wheel, 0));
        assert!(!monitor.observe(ActivityKind::Wheel, 900));
        assert!(monitor.observe(ActivityKind::Wheel, 1_000));
    }

    #[test]
    fn zero_throttle_forwards_everything() {
        let mut monitor = ActivityMonitor::new(0);
        assert!(monitor.observe(ActivityKind::Click, 10));
        assert!(monitor.observe(ActivityKind::Click, 10));
    }

    #[test]
    fn clear_reopens_window() {
        let mut monitor = ActivityMonitor::new(1_000);
        assert!(monitor.observe(ActivityKind::TouchStart, 0));
        monitor.clear();
        assert!(monitor.observe(ActivityKind::TouchStart, 10));
    }

    #[test]
    fn kind_parses_snake_case_names() {
        for kind in ActivityKind::ALL {
            assert_eq!(kind.as_str().parse::<ActivityKind>(), Ok(kind));
        }
        assert!("hover".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ActivityKind::PointerDown).expect("serialize");
        assert_eq!(json, "\"pointer_down\"");
    }
}
