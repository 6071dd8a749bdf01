//! Storage abstraction for persisting schedules and the app registry.
//!
//! This module provides trait-based storage with pluggable backends
//! (in-memory, SQLite). Both mutating schedule writes are conditional: they
//! apply only if the stored `version` still equals the version carried by
//! the entity passed in, and they bump it on success.

mod memory;
#[cfg(any(feature = "sqlite", test))]
mod sqlite;

pub use memory::InMemoryStorage;
#[cfg(any(feature = "sqlite", test))]
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::schedule::{App, Schedule};
use crate::core::status::ScheduleStatus;
use crate::core::types::{AppId, ScheduleId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A duplicate key was detected.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A conditional write lost against a concurrent writer.
    #[error("version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: String,
        expected: u64,
        found: u64,
    },

    /// The store did not answer in time.
    #[error("storage operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Storage lock was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Generic storage error.
    #[error("storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Whether the store answered and reported the item absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Durable owner of schedule rows.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Insert a new schedule.
    async fn save_schedule(&self, schedule: Schedule) -> Result<(), StorageError>;

    /// Get a schedule by ID.
    async fn get_schedule(&self, id: &ScheduleId) -> Result<Schedule, StorageError>;

    /// Set the status of a recurring schedule.
    ///
    /// Conditional on `schedule.version`. Returns the row as persisted.
    async fn update_recurring_schedule_status(
        &self,
        schedule: &Schedule,
        status: ScheduleStatus,
    ) -> Result<Schedule, StorageError>;

    /// Replace the mutable fields of a recurring schedule.
    ///
    /// Conditional on `schedule.version`. Returns the row as persisted.
    async fn update_recurring_schedule(&self, schedule: &Schedule)
    -> Result<Schedule, StorageError>;
}

/// Lookup of application records used as validation context.
#[async_trait]
pub trait AppRegistry: Send + Sync {
    /// Register an application.
    async fn save_app(&self, app: App) -> Result<(), StorageError>;

    /// Get an application by ID.
    async fn get_app(&self, app_id: &AppId) -> Result<App, StorageError>;
}
