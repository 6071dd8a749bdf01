//! Pause, resume and update of recurring schedules.
//!
//! Every operation fetches the schedule fresh, runs the validation pipeline
//! and issues at most one conditional write. No lock is held across the
//! fetch-validate-write sequence; a concurrent writer is detected by the
//! store's version check and surfaces as a persistence failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::LifecycleError;
use super::patch::SchedulePatch;
use super::validation::{ValidationPipeline, parse_schedule_id, resolve_fetch};
use crate::config::ValidationRules;
use crate::core::schedule::{App, Schedule};
use crate::core::status::{LifecycleAction, StatusChange};
use crate::core::types::{AppId, ScheduleId};
use crate::metrics::{LifecycleMetrics, RequestOutcome};
use crate::storage::{AppRegistry, ScheduleRepository, StorageError};

const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(2);

/// What a successful lifecycle operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub action: LifecycleAction,
    /// The schedule as persisted, or as read when nothing was written.
    pub schedule: Schedule,
    /// False when the operation succeeded without writing.
    pub written: bool,
}

/// Orchestrates lifecycle operations against the schedule repository.
pub struct LifecycleController {
    schedules: Arc<dyn ScheduleRepository>,
    apps: Arc<dyn AppRegistry>,
    rules: ValidationRules,
    storage_timeout: Duration,
    metrics: Option<Arc<LifecycleMetrics>>,
}

impl Clone for LifecycleController {
    fn clone(&self) -> Self {
        Self {
            schedules: Arc::clone(&self.schedules),
            apps: Arc::clone(&self.apps),
            rules: self.rules.clone(),
            storage_timeout: self.storage_timeout,
            metrics: self.metrics.clone(),
        }
    }
}

impl LifecycleController {
    /// Create a controller with default rules and timeout.
    pub fn new(schedules: Arc<dyn ScheduleRepository>, apps: Arc<dyn AppRegistry>) -> Self {
        Self {
            schedules,
            apps,
            rules: ValidationRules::default(),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            metrics: None,
        }
    }

    /// Set the business validation rules.
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set the upper bound for a single repository call.
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Count every pause, resume and update by outcome.
    pub fn with_metrics(mut self, metrics: Arc<LifecycleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&LifecycleMetrics> {
        self.metrics.as_deref()
    }

    /// Read a schedule without changing it.
    pub async fn get(&self, raw_id: &str) -> Result<Schedule, LifecycleError> {
        let id = parse_schedule_id(raw_id)?;
        self.fetch(id).await
    }

    /// Suspend a recurring schedule.
    ///
    /// Pausing a paused schedule succeeds without writing.
    pub async fn pause(&self, raw_id: &str) -> Result<Outcome, LifecycleError> {
        let result = self.transition(raw_id, LifecycleAction::Pause).await;
        self.record(LifecycleAction::Pause, &result);
        result
    }

    /// Reactivate a paused recurring schedule.
    pub async fn resume(&self, raw_id: &str) -> Result<Outcome, LifecycleError> {
        let result = self.transition(raw_id, LifecycleAction::Resume).await;
        self.record(LifecycleAction::Resume, &result);
        result
    }

    /// Apply a JSON patch body to a recurring schedule.
    ///
    /// The identifier is checked before the body is decoded.
    pub async fn update(&self, raw_id: &str, body: &[u8]) -> Result<Outcome, LifecycleError> {
        let result = async {
            let id = parse_schedule_id(raw_id)?;
            let patch = SchedulePatch::from_json(body).inspect_err(|e| {
                tracing::warn!(schedule_id = %id, error = %e, "Rejected update body");
            })?;
            self.apply_patch(id, patch).await
        }
        .await;
        self.record(LifecycleAction::Update, &result);
        result
    }

    /// Apply an already decoded patch to a recurring schedule.
    pub async fn update_with_patch(
        &self,
        raw_id: &str,
        patch: SchedulePatch,
    ) -> Result<Outcome, LifecycleError> {
        let result = match parse_schedule_id(raw_id) {
            Ok(id) => self.apply_patch(id, patch).await,
            Err(e) => Err(e),
        };
        self.record(LifecycleAction::Update, &result);
        result
    }

    fn record(&self, action: LifecycleAction, result: &Result<Outcome, LifecycleError>) {
        if let Some(metrics) = &self.metrics {
            let outcome = match result {
                Ok(_) => RequestOutcome::Success,
                Err(_) => RequestOutcome::Fail,
            };
            metrics.record(action, outcome);
        }
    }

    async fn transition(
        &self,
        raw_id: &str,
        action: LifecycleAction,
    ) -> Result<Outcome, LifecycleError> {
        let id = parse_schedule_id(raw_id)?;
        let stored = self.fetch(id).await?;

        let change = ValidationPipeline::for_action(action)
            .admit(&stored, None)
            .inspect_err(|e| log_rejection(id, action, e))?;

        let StatusChange::Move { from, to } = change else {
            tracing::debug!(schedule_id = %id, %action, status = %stored.status, "No status change needed");
            return Ok(Outcome {
                action,
                schedule: stored,
                written: false,
            });
        };

        let persisted = self
            .bounded(
                self.schedules
                    .update_recurring_schedule_status(&stored, to),
            )
            .await
            .map_err(|e| persistence_failure(id, action, e))?;

        tracing::info!(schedule_id = %id, %action, %from, %to, "Schedule status changed");
        Ok(Outcome {
            action,
            schedule: persisted,
            written: true,
        })
    }

    async fn apply_patch(
        &self,
        id: ScheduleId,
        patch: SchedulePatch,
    ) -> Result<Outcome, LifecycleError> {
        let action = LifecycleAction::Update;
        let pipeline = ValidationPipeline::for_action(action);
        let stored = self.fetch(id).await?;

        pipeline
            .admit(&stored, Some(&patch))
            .inspect_err(|e| log_rejection(id, action, e))?;

        let app = self.fetch_app(&stored.app_id).await?;
        let rules = self.rules.for_app(&app.app_id);
        let merged = pipeline
            .finalize(&stored, &patch, &app, &rules)
            .inspect_err(|e| log_rejection(id, action, e))?;

        let persisted = self
            .bounded(self.schedules.update_recurring_schedule(&merged))
            .await
            .map_err(|e| persistence_failure(id, action, e))?;

        tracing::info!(schedule_id = %id, version = persisted.version, "Recurring schedule updated");
        Ok(Outcome {
            action,
            schedule: persisted,
            written: true,
        })
    }

    async fn fetch(&self, id: ScheduleId) -> Result<Schedule, LifecycleError> {
        let fetched = self.bounded(self.schedules.get_schedule(&id)).await;
        resolve_fetch(id, fetched).inspect_err(|e| match e {
            LifecycleError::NotFound(_) => {
                tracing::info!(schedule_id = %id, "Schedule not found")
            }
            _ => tracing::error!(schedule_id = %id, error = %e, "Failed to fetch schedule"),
        })
    }

    async fn fetch_app(&self, app_id: &AppId) -> Result<App, LifecycleError> {
        match self.bounded(self.apps.get_app(app_id)).await {
            Ok(app) => Ok(app),
            Err(e) if e.is_not_found() => {
                tracing::warn!(app_id = %app_id, "App not found");
                Err(LifecycleError::AppNotFound(app_id.clone()))
            }
            Err(e) => {
                tracing::error!(app_id = %app_id, error = %e, "Failed to fetch app");
                Err(LifecycleError::Persistence(e))
            }
        }
    }

    /// Run one repository call under the storage timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        tokio::time::timeout(self.storage_timeout, call)
            .await
            .unwrap_or(Err(StorageError::Timeout(self.storage_timeout)))
    }
}

fn log_rejection(id: ScheduleId, action: LifecycleAction, err: &LifecycleError) {
    tracing::warn!(schedule_id = %id, %action, error = %err, "Lifecycle request rejected");
}

fn persistence_failure(id: ScheduleId, action: LifecycleAction, err: StorageError) -> LifecycleError {
    tracing::error!(schedule_id = %id, %action, error = %err, "Failed to persist schedule");
    LifecycleError::Persistence(err)
}
