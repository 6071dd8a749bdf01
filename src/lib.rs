//! cadence - lifecycle control for recurring schedules.
//!
//! Pause, resume and partially update recurring schedules. Each operation
//! fetches the schedule, validates the request in a fixed order and ends in
//! at most one conditional write against the schedule repository.

pub mod api;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod metrics;
pub mod storage;
pub mod testing;

pub use crate::config::{ServiceConfig, ValidationRules, YamlLoader};
pub use crate::core::callback::{Callback, CallbackError, CallbackKind};
pub use crate::core::cron::{CronError, CronSchedule};
pub use crate::core::schedule::{App, Schedule};
pub use crate::core::status::{LifecycleAction, ScheduleStatus, StatusChange, TransitionError};
pub use crate::core::types::{AppId, PartitionId, ScheduleId};
pub use crate::core::violation::FieldViolation;
pub use crate::lifecycle::{ErrorKind, LifecycleController, LifecycleError, Outcome, SchedulePatch};
pub use crate::metrics::{LifecycleMetrics, RequestOutcome};
pub use crate::storage::{AppRegistry, InMemoryStorage, ScheduleRepository, StorageError};
#[cfg(feature = "sqlite")]
pub use crate::storage::SqliteStorage;
