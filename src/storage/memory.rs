//! In-memory storage implementation.
//!
//! Provides a thread-safe in-memory backend for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{AppRegistry, ScheduleRepository, StorageError};
use crate::core::schedule::{App, Schedule};
use crate::core::status::ScheduleStatus;
use crate::core::types::{AppId, ScheduleId};

/// In-memory storage backend.
///
/// Thread-safe storage using RwLock for concurrent access. Each conditional
/// write checks and bumps the version under one write lock.
/// Data is not persisted across restarts.
pub struct InMemoryStorage {
    schedules: RwLock<HashMap<ScheduleId, Schedule>>,
    apps: RwLock<HashMap<AppId, App>>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new() -> Self {
        Self {
            schedules: RwLock::new(HashMap::new()),
            apps: RwLock::new(HashMap::new()),
        }
    }

    /// Apply `mutate` to the stored row if its version matches `expected`.
    fn write_if_version<F>(
        &self,
        id: &ScheduleId,
        expected: u64,
        mutate: F,
    ) -> Result<Schedule, StorageError>
    where
        F: FnOnce(&mut Schedule),
    {
        let mut schedules = self
            .schedules
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let stored = schedules
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("schedule: {}", id)))?;
        if stored.version != expected {
            return Err(StorageError::VersionConflict {
                id: id.to_string(),
                expected,
                found: stored.version,
            });
        }
        mutate(stored);
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStorage {
    async fn save_schedule(&self, schedule: Schedule) -> Result<(), StorageError> {
        let mut schedules = self
            .schedules
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if schedules.contains_key(&schedule.schedule_id) {
            return Err(StorageError::DuplicateKey(format!(
                "schedule: {}",
                schedule.schedule_id
            )));
        }
        schedules.insert(schedule.schedule_id, schedule);
        Ok(())
    }

    async fn get_schedule(&self, id: &ScheduleId) -> Result<Schedule, StorageError> {
        let schedules = self
            .schedules
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        schedules
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("schedule: {}", id)))
    }

    async fn update_recurring_schedule_status(
        &self,
        schedule: &Schedule,
        status: ScheduleStatus,
    ) -> Result<Schedule, StorageError> {
        self.write_if_version(&schedule.schedule_id, schedule.version, |stored| {
            stored.status = status;
        })
    }

    async fn update_recurring_schedule(
        &self,
        schedule: &Schedule,
    ) -> Result<Schedule, StorageError> {
        self.write_if_version(&schedule.schedule_id, schedule.version, |stored| {
            stored.cron_expression = schedule.cron_expression.clone();
            stored.payload = schedule.payload.clone();
            stored.callback = schedule.callback.clone();
        })
    }
}

#[async_trait]
impl AppRegistry for InMemoryStorage {
    async fn save_app(&self, app: App) -> Result<(), StorageError> {
        let mut apps = self.apps.write().map_err(|_| StorageError::LockPoisoned)?;
        if apps.contains_key(&app.app_id) {
            return Err(StorageError::DuplicateKey(format!("app: {}", app.app_id)));
        }
        apps.insert(app.app_id.clone(), app);
        Ok(())
    }

    async fn get_app(&self, app_id: &AppId) -> Result<App, StorageError> {
        let apps = self.apps.read().map_err(|_| StorageError::LockPoisoned)?;
        apps.get(app_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("app: {}", app_id)))
    }
}
