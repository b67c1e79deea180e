// ABOUTME: The control loop: guard, self-trigger filter, orchestrators and history.
// ABOUTME: Decides when an update or rollback may run and how version tags move.

mod clock;
mod controller;
mod error;
pub mod filter;
mod guard;
mod history;
mod outcome;
mod rollback;
mod update;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{
    ControlSettings, Controller, DEFAULT_MUTABLE_TAG, DEFAULT_WINDOW, DebounceMode,
};
pub use error::{ControlError, ErrorKind, RollbackStep};
pub use filter::{AuditLogFilter, MarkerFilter, SelfTriggerFilter, was_just_rolled_back};
pub use guard::{MIN_HISTORY_DEPTH, ensure_idle};
pub use history::HistoryRecorder;
pub use outcome::{Completion, Outcome, Status};
pub use rollback::rollback;
pub use update::update;
