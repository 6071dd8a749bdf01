//! SQLite storage implementation.
//!
//! Provides persistent storage using SQLite database. Conditional writes are
//! single `UPDATE ... WHERE version = ? RETURNING ...` statements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::{AppRegistry, ScheduleRepository, StorageError};
use crate::core::callback::{Callback, CallbackKind};
use crate::core::schedule::{App, Schedule};
use crate::core::status::ScheduleStatus;
use crate::core::types::{AppId, PartitionId, ScheduleId};

const SCHEDULE_COLUMNS: &str = "schedule_id, app_id, partition_id, cron_expression, payload, \
     callback, status, version, created_at, updated_at";

type ScheduleRow = (
    String,
    String,
    i64,
    String,
    String,
    Option<String>,
    String,
    i64,
    String,
    String,
);

/// SQLite storage backend.
///
/// Provides persistent storage with automatic schema migration.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| StorageError::Other(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (useful for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        let schema = include_str!("../../migrations/001_initial_schema.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Other(format!("migration failed: {}", e)))?;
        Ok(())
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Explain why a conditional write matched no row.
    async fn write_miss(&self, id: &ScheduleId, expected: u64) -> StorageError {
        let found: Result<Option<(i64,)>, _> =
            sqlx::query_as("SELECT version FROM schedules WHERE schedule_id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await;
        match found {
            Ok(Some((found,))) => StorageError::VersionConflict {
                id: id.to_string(),
                expected,
                found: found as u64,
            },
            Ok(None) => StorageError::NotFound(format!("schedule: {}", id)),
            Err(e) => StorageError::Other(e.to_string()),
        }
    }
}

fn time_to_string(time: DateTime<Utc>) -> String {
    time.timestamp_millis().to_string()
}

fn string_to_time(s: &str) -> DateTime<Utc> {
    s.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

fn callback_to_string(callback: Option<&Callback>) -> Result<Option<String>, StorageError> {
    callback
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn row_to_schedule(row: ScheduleRow) -> Result<Schedule, StorageError> {
    let schedule_id = ScheduleId::parse(&row.0)
        .map_err(|e| StorageError::SerializationError(format!("schedule_id: {}", e)))?;
    let callback = row
        .5
        .as_deref()
        .map(serde_json::from_str::<Callback>)
        .transpose()
        .map_err(|e| StorageError::SerializationError(format!("callback: {}", e)))?;
    let status = ScheduleStatus::parse(&row.6)
        .ok_or_else(|| StorageError::SerializationError(format!("status: {}", row.6)))?;

    Ok(Schedule {
        schedule_id,
        app_id: AppId::new(row.1),
        partition_id: PartitionId::new(row.2 as u32),
        cron_expression: row.3,
        payload: row.4,
        callback,
        status,
        version: row.7 as u64,
        created_at: string_to_time(&row.8),
        updated_at: string_to_time(&row.9),
    })
}

#[async_trait]
impl ScheduleRepository for SqliteStorage {
    async fn save_schedule(&self, schedule: Schedule) -> Result<(), StorageError> {
        let callback = callback_to_string(schedule.callback.as_ref())?;
        let result = sqlx::query(
            r#"
            INSERT INTO schedules (schedule_id, app_id, partition_id, cron_expression, payload,
                                   callback, status, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(schedule.schedule_id.to_string())
        .bind(schedule.app_id.as_str())
        .bind(schedule.partition_id.get() as i64)
        .bind(&schedule.cron_expression)
        .bind(&schedule.payload)
        .bind(callback)
        .bind(schedule.status.as_str())
        .bind(schedule.version as i64)
        .bind(time_to_string(schedule.created_at))
        .bind(time_to_string(schedule.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                StorageError::DuplicateKey(format!("schedule: {}", schedule.schedule_id)),
            ),
            Err(e) => Err(StorageError::Other(e.to_string())),
        }
    }

    async fn get_schedule(&self, id: &ScheduleId) -> Result<Schedule, StorageError> {
        let row: ScheduleRow = sqlx::query_as(&format!(
            "SELECT {} FROM schedules WHERE schedule_id = ?",
            SCHEDULE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
        .ok_or_else(|| StorageError::NotFound(format!("schedule: {}", id)))?;

        row_to_schedule(row)
    }

    async fn update_recurring_schedule_status(
        &self,
        schedule: &Schedule,
        status: ScheduleStatus,
    ) -> Result<Schedule, StorageError> {
        let row: Option<ScheduleRow> = sqlx::query_as(&format!(
            r#"
            UPDATE schedules SET status = ?, version = version + 1, updated_at = ?
            WHERE schedule_id = ? AND version = ?
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(status.as_str())
        .bind(time_to_string(Utc::now()))
        .bind(schedule.schedule_id.to_string())
        .bind(schedule.version as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        match row {
            Some(row) => row_to_schedule(row),
            None => Err(self.write_miss(&schedule.schedule_id, schedule.version).await),
        }
    }

    async fn update_recurring_schedule(
        &self,
        schedule: &Schedule,
    ) -> Result<Schedule, StorageError> {
        let callback = callback_to_string(schedule.callback.as_ref())?;
        let row: Option<ScheduleRow> = sqlx::query_as(&format!(
            r#"
            UPDATE schedules
            SET cron_expression = ?, payload = ?, callback = ?,
                version = version + 1, updated_at = ?
            WHERE schedule_id = ? AND version = ?
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(&schedule.cron_expression)
        .bind(&schedule.payload)
        .bind(callback)
        .bind(time_to_string(Utc::now()))
        .bind(schedule.schedule_id.to_string())
        .bind(schedule.version as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        match row {
            Some(row) => row_to_schedule(row),
            None => Err(self.write_miss(&schedule.schedule_id, schedule.version).await),
        }
    }
}

#[async_trait]
impl AppRegistry for SqliteStorage {
    async fn save_app(&self, app: App) -> Result<(), StorageError> {
        let allowed = serde_json::to_string(&app.allowed_callbacks)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let result = sqlx::query(
            "INSERT INTO apps (app_id, partitions, active, allowed_callbacks) VALUES (?, ?, ?, ?)",
        )
        .bind(app.app_id.as_str())
        .bind(app.partitions as i64)
        .bind(app.active)
        .bind(allowed)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StorageError::DuplicateKey(format!("app: {}", app.app_id)))
            }
            Err(e) => Err(StorageError::Other(e.to_string())),
        }
    }

    async fn get_app(&self, app_id: &AppId) -> Result<App, StorageError> {
        let row: (String, i64, bool, String) = sqlx::query_as(
            "SELECT app_id, partitions, active, allowed_callbacks FROM apps WHERE app_id = ?",
        )
        .bind(app_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
        .ok_or_else(|| StorageError::NotFound(format!("app: {}", app_id)))?;

        let allowed_callbacks: Vec<CallbackKind> = serde_json::from_str(&row.3)
            .map_err(|e| StorageError::SerializationError(format!("allowed_callbacks: {}", e)))?;

        Ok(App {
            app_id: AppId::new(row.0),
            partitions: row.1 as u32,
            active: row.2,
            allowed_callbacks,
        })
    }
}
