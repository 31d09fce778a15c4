//! # session-guard
//!
//! Inactivity session guard for an authenticated dashboard session: throttles
//! user activity, shows a warning with a countdown after a period of idle
//! time, and terminates the session when the grace period runs out.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The live driver is a plain
//!   `mpsc` event loop.
//! - **Not thread-safe**: A guard belongs to one event loop. Clients provide
//!   their own synchronization if they share it.
//! - **Injected time**: Every deadline is computed from a `Clock`, so tests run
//!   on a `ManualClock` without sleeping.
//! - **One timer slot**: Arming always replaces the previous deadline; the
//!   warning countdown is derived from the logout deadline.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use session_guard::{ActivityKind, GuardConfig, SessionGuard, SystemClock};
//!
//! let mut guard = SessionGuard::new(GuardConfig::default(), SystemClock::new(), || {
//!     // clear credentials, redirect to login
//! })?;
//! guard.authenticate();
//! guard.record_activity(ActivityKind::Click);
//! let transitions = guard.poll();
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod machine;
pub mod monitor;
pub mod runtime;
pub mod trace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::*;
pub use error::{GuardError, Result};
pub use guard::{SessionGuard, SessionTerminator};
pub use machine::{GuardState, TimeoutMachine, Transition, TransitionCause, WarningView};
pub use monitor::{ActivityKind, ActivityMonitor};
pub use runtime::{advance_to, run_event_loop, GuardCommand, RunOutcome};
pub use trace::{format_transition, TransitionRecord};
