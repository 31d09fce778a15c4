//! Time sources for the guard.
//!
//! All deadlines are monotonic milliseconds since the clock's origin, so the
//! state machine never reads wall-clock time directly.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Real monotonic clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    started_at: DateTime<Utc>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time for an offset returned by `now_ms`.
    pub fn wall_time(&self, at_ms: u64) -> DateTime<Utc> {
        let offset = i64::try_from(at_ms).unwrap_or(i64::MAX);
        self.started_at
            .checked_add_signed(ChronoDuration::milliseconds(offset))
            .unwrap_or(self.started_at)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now_ms)),
        }
    }

    /// Moves the clock to `now_ms`. Earlier values are ignored.
    pub fn set(&self, now_ms: u64) {
        if now_ms > self.now_ms.get() {
            self.now_ms.set(now_ms);
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
