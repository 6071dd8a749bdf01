//! Lifecycle errors and their classification.

use thiserror::Error;

use crate::core::callback::CallbackError;
use crate::core::status::TransitionError;
use crate::core::types::{AppId, ScheduleId};
use crate::core::violation::{FieldViolation, join_violations};
use crate::storage::StorageError;

/// The class a lifecycle failure resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed identifier or body, immutable-field violation, unknown app.
    ClientInput,
    /// The identifier does not resolve to a schedule.
    NotFound,
    /// The current status forbids the operation.
    Conflict,
    /// Wrong recurrence type or failed business validation.
    Unprocessable,
    /// The store could not be reached, timed out or rejected the write.
    Persistence,
}

/// Errors returned by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The schedule identifier is not a valid UUID.
    #[error("invalid schedule id '{input}': {reason}")]
    InvalidScheduleId { input: String, reason: String },

    /// The request body could not be decoded.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// The patch tries to change fields fixed at creation.
    #[error("{}", join_violations(.0))]
    ImmutableFields(Vec<FieldViolation>),

    /// The patch carries a callback that cannot be decoded.
    #[error("invalid callback: {0}")]
    InvalidCallback(#[from] CallbackError),

    /// The owning application is not registered.
    #[error("app {0} not found")]
    AppNotFound(AppId),

    /// No schedule with this identifier.
    #[error("schedule with id: {0} not found")]
    NotFound(ScheduleId),

    /// The schedule has no cron expression.
    #[error("schedule with id: {0} is not a recurring schedule")]
    NotRecurring(ScheduleId),

    /// The current status forbids the operation.
    #[error("schedule with id: {id}: {source}")]
    Transition {
        id: ScheduleId,
        #[source]
        source: TransitionError,
    },

    /// The merged schedule fails business validation.
    #[error("{}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// Reading or writing the store failed.
    #[error("{0}")]
    Persistence(#[source] StorageError),
}

impl LifecycleError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::InvalidScheduleId { .. }
            | LifecycleError::MalformedBody(_)
            | LifecycleError::ImmutableFields(_)
            | LifecycleError::InvalidCallback(_)
            | LifecycleError::AppNotFound(_) => ErrorKind::ClientInput,
            LifecycleError::NotFound(_) => ErrorKind::NotFound,
            LifecycleError::Transition { .. } => ErrorKind::Conflict,
            LifecycleError::NotRecurring(_) | LifecycleError::Validation(_) => {
                ErrorKind::Unprocessable
            }
            LifecycleError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Field-level violations carried by the error, if any.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            LifecycleError::ImmutableFields(v) | LifecycleError::Validation(v) => v,
            _ => &[],
        }
    }
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        LifecycleError::Persistence(err)
    }
}
