//! Schedule status and the lifecycle state machine.
//!
//! Pause, resume and update act on `Scheduled`, `Paused` and `Deleted`.
//! The remaining statuses belong to the run path; pause treats them like
//! `Scheduled`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    /// Active; future firings will be produced.
    Scheduled,
    /// Suspended; no firings until resumed.
    Paused,
    /// Removed. Terminal.
    Deleted,
    /// Run path: the firing completed successfully.
    Success,
    /// Run path: the firing failed.
    Failure,
    /// Run path: the firing was missed.
    Miss,
}

/// A lifecycle operation that may move a schedule between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Pause,
    Resume,
    Update,
}

/// Result of applying a lifecycle action to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The status moves and must be written.
    Move {
        from: ScheduleStatus,
        to: ScheduleStatus,
    },
    /// The status stays as it is.
    Unchanged(ScheduleStatus),
}

/// A lifecycle action is not permitted from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} a schedule in status {from}")]
pub struct TransitionError {
    pub action: LifecycleAction,
    pub from: ScheduleStatus,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "SCHEDULED",
            ScheduleStatus::Paused => "PAUSED",
            ScheduleStatus::Deleted => "DELETED",
            ScheduleStatus::Success => "SUCCESS",
            ScheduleStatus::Failure => "FAILURE",
            ScheduleStatus::Miss => "MISS",
        }
    }

    /// Parse the stored textual form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(ScheduleStatus::Scheduled),
            "PAUSED" => Some(ScheduleStatus::Paused),
            "DELETED" => Some(ScheduleStatus::Deleted),
            "SUCCESS" => Some(ScheduleStatus::Success),
            "FAILURE" => Some(ScheduleStatus::Failure),
            "MISS" => Some(ScheduleStatus::Miss),
            _ => None,
        }
    }

    /// Apply a lifecycle action.
    ///
    /// - Pause moves any status but `Deleted` to `Paused`; pausing a paused
    ///   schedule is a no-op.
    /// - `Paused -> Scheduled` on resume; resuming anything else is rejected.
    /// - Update never changes the status and is admitted from every status.
    pub fn apply(self, action: LifecycleAction) -> Result<StatusChange, TransitionError> {
        match (action, self) {
            (LifecycleAction::Pause, ScheduleStatus::Deleted) => {
                Err(TransitionError { action, from: self })
            }
            (LifecycleAction::Pause, ScheduleStatus::Paused) => Ok(StatusChange::Unchanged(self)),
            (LifecycleAction::Pause, _) => Ok(StatusChange::Move {
                from: self,
                to: ScheduleStatus::Paused,
            }),
            (LifecycleAction::Resume, ScheduleStatus::Paused) => Ok(StatusChange::Move {
                from: self,
                to: ScheduleStatus::Scheduled,
            }),
            (LifecycleAction::Resume, _) => Err(TransitionError { action, from: self }),
            (LifecycleAction::Update, _) => Ok(StatusChange::Unchanged(self)),
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleAction::Pause => "pause",
            LifecycleAction::Resume => "resume",
            LifecycleAction::Update => "update",
        };
        f.write_str(name)
    }
}
