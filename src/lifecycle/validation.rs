//! Ordered validation checks for lifecycle operations.
//!
//! Checks run in a fixed order and the first failure decides the error:
//!
//! 1. identifier syntax
//! 2. existence (resolved against the repository by the controller)
//! 3. recurrence
//! 4. status compatibility
//! 5. immutable fields (update only)
//! 6. field merge (update only)
//! 7. business rules (update only)
//!
//! Checks 5 and 7 collect every violation before failing.

use chrono::{DateTime, Utc};

use super::error::LifecycleError;
use super::patch::SchedulePatch;
use crate::config::AppRules;
use crate::core::callback::Callback;
use crate::core::cron::CronSchedule;
use crate::core::schedule::{App, Schedule};
use crate::core::status::{LifecycleAction, StatusChange};
use crate::core::types::ScheduleId;
use crate::core::violation::FieldViolation;
use crate::storage::StorageError;

/// Upcoming firings sampled when measuring the cron interval.
const CRON_SAMPLES: usize = 5;

/// A single pipeline stage that runs against a fetched schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Recurrence,
    Status,
    ImmutableFields,
    Merge,
    BusinessRules,
}

const PAUSE_RESUME_CHECKS: &[Check] = &[Check::Recurrence, Check::Status];
const UPDATE_CHECKS: &[Check] = &[
    Check::Recurrence,
    Check::Status,
    Check::ImmutableFields,
    Check::Merge,
    Check::BusinessRules,
];

/// The ordered checks for one lifecycle action.
#[derive(Debug, Clone, Copy)]
pub struct ValidationPipeline {
    action: LifecycleAction,
    checks: &'static [Check],
}

impl ValidationPipeline {
    pub fn for_action(action: LifecycleAction) -> Self {
        let checks = match action {
            LifecycleAction::Pause | LifecycleAction::Resume => PAUSE_RESUME_CHECKS,
            LifecycleAction::Update => UPDATE_CHECKS,
        };
        Self { action, checks }
    }

    /// Run every check that needs only the stored schedule and the patch.
    ///
    /// Stops before the merge, which needs the owning app.
    pub fn admit(
        &self,
        stored: &Schedule,
        patch: Option<&SchedulePatch>,
    ) -> Result<StatusChange, LifecycleError> {
        let mut change = StatusChange::Unchanged(stored.status);
        for check in self.checks {
            match check {
                Check::Recurrence => ensure_recurring(stored)?,
                Check::Status => change = check_status(stored, self.action)?,
                Check::ImmutableFields => {
                    if let Some(patch) = patch {
                        check_immutable_fields(patch, stored)?;
                    }
                }
                Check::Merge | Check::BusinessRules => break,
            }
        }
        Ok(change)
    }

    /// Merge the patch and validate the result against the owning app.
    pub fn finalize(
        &self,
        stored: &Schedule,
        patch: &SchedulePatch,
        app: &App,
        rules: &AppRules<'_>,
    ) -> Result<Schedule, LifecycleError> {
        let mut merged = stored.clone();
        for check in self.checks {
            match check {
                Check::Merge => merged = merge_patch(stored, patch)?,
                Check::BusinessRules => {
                    let violations = validate_schedule(&merged, app, rules, Utc::now());
                    if !violations.is_empty() {
                        return Err(LifecycleError::Validation(violations));
                    }
                }
                _ => {}
            }
        }
        Ok(merged)
    }
}

/// Check 1: the identifier must be a UUID.
pub fn parse_schedule_id(raw: &str) -> Result<ScheduleId, LifecycleError> {
    ScheduleId::parse(raw).map_err(|e| LifecycleError::InvalidScheduleId {
        input: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Check 2: keep "absent" apart from "could not determine".
pub fn resolve_fetch(
    id: ScheduleId,
    fetched: Result<Schedule, StorageError>,
) -> Result<Schedule, LifecycleError> {
    match fetched {
        Ok(schedule) => Ok(schedule),
        Err(e) if e.is_not_found() => Err(LifecycleError::NotFound(id)),
        Err(e) => Err(LifecycleError::Persistence(e)),
    }
}

/// Check 3: only recurring schedules have a lifecycle.
pub fn ensure_recurring(schedule: &Schedule) -> Result<(), LifecycleError> {
    if schedule.is_recurring() {
        Ok(())
    } else {
        Err(LifecycleError::NotRecurring(schedule.schedule_id))
    }
}

/// Check 4: the current status must admit the action.
pub fn check_status(
    schedule: &Schedule,
    action: LifecycleAction,
) -> Result<StatusChange, LifecycleError> {
    schedule
        .status
        .apply(action)
        .map_err(|source| LifecycleError::Transition {
            id: schedule.schedule_id,
            source,
        })
}

/// Check 5: fields fixed at creation may be repeated but not changed.
pub fn check_immutable_fields(
    patch: &SchedulePatch,
    stored: &Schedule,
) -> Result<(), LifecycleError> {
    let mut violations = Vec::new();

    if patch
        .requested_app_id()
        .is_some_and(|app_id| *app_id != stored.app_id)
    {
        violations.push(FieldViolation::new(
            "appId",
            "cannot modify appId for an existing schedule",
        ));
    }

    if patch
        .requested_schedule_id()
        .is_some_and(|id| id != stored.schedule_id)
    {
        violations.push(FieldViolation::new(
            "scheduleId",
            "cannot modify scheduleId for an existing schedule",
        ));
    }

    if patch
        .requested_partition_id()
        .is_some_and(|partition| partition != stored.partition_id)
    {
        violations.push(FieldViolation::new(
            "partitionId",
            "cannot modify partitionId for an existing schedule",
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::ImmutableFields(violations))
    }
}

/// Check 6: overlay each requested field onto a copy of the stored schedule.
pub fn merge_patch(stored: &Schedule, patch: &SchedulePatch) -> Result<Schedule, LifecycleError> {
    let mut merged = stored.clone();

    if let Some(cron) = patch.requested_cron() {
        merged.cron_expression = cron.to_string();
    }
    if let Some(payload) = patch.requested_payload() {
        merged.payload = payload.to_string();
    }
    if let Some(raw) = patch.requested_callback() {
        merged.callback = Some(Callback::from_raw(raw)?);
    }

    Ok(merged)
}

/// Check 7: cross-field and domain rules for a schedule owned by `app`.
pub fn validate_schedule(
    schedule: &Schedule,
    app: &App,
    rules: &AppRules<'_>,
    now: DateTime<Utc>,
) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if !app.active {
        violations.push(FieldViolation::new(
            "appId",
            format!("app {} is not active", app.app_id),
        ));
    }

    if schedule.partition_id.get() >= app.partitions {
        violations.push(FieldViolation::new(
            "partitionId",
            format!(
                "partition {} is out of range for app {} with {} partition(s)",
                schedule.partition_id, app.app_id, app.partitions
            ),
        ));
    }

    match CronSchedule::with_timezone(&schedule.cron_expression, rules.timezone) {
        Ok(cron) => match cron.min_gap_after(now, CRON_SAMPLES) {
            Some(gap) if gap < rules.min_cron_interval => {
                violations.push(FieldViolation::new(
                    "cronExpression",
                    format!(
                        "fires every {}s, more often than the minimum of {}s",
                        gap.as_secs(),
                        rules.min_cron_interval.as_secs()
                    ),
                ));
            }
            Some(_) => {}
            None => violations.push(FieldViolation::new(
                "cronExpression",
                "has no upcoming firings",
            )),
        },
        Err(e) => violations.push(FieldViolation::new("cronExpression", e.to_string())),
    }

    if schedule.payload.len() > rules.max_payload_bytes {
        violations.push(FieldViolation::new(
            "payload",
            format!(
                "payload of {} bytes exceeds the limit of {} bytes",
                schedule.payload.len(),
                rules.max_payload_bytes
            ),
        ));
    }

    match &schedule.callback {
        None => violations.push(FieldViolation::new("callback", "is required")),
        Some(callback) => {
            if !app.allows(callback.kind()) {
                violations.push(FieldViolation::new(
                    "callback.type",
                    format!(
                        "callback type {} is not allowed for app {}",
                        callback.kind(),
                        app.app_id
                    ),
                ));
            }
            violations.extend(callback.validate());
        }
    }

    violations
}
