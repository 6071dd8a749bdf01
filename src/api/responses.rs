//! API response types.
//!
//! Every schedule endpoint answers with the same envelope: a `status` block
//! followed by either `data` on success or `errors` on failure.

use serde::Serialize;

use crate::core::schedule::Schedule;
use crate::core::status::LifecycleAction;
use crate::core::violation::FieldViolation;
use crate::lifecycle::Outcome;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Whether the envelope reports a success or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    Success,
    Fail,
}

/// The `status` block of an envelope.
#[derive(Debug, Serialize)]
pub struct StatusBlock {
    pub code: u16,
    pub message: String,
    #[serde(rename = "type")]
    pub result_type: ResultType,
}

/// Success payload.
#[derive(Debug, Serialize)]
pub struct ScheduleData {
    pub schedule: Schedule,
}

/// Success envelope carrying the resulting schedule.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub status: StatusBlock,
    pub data: ScheduleData,
}

impl ScheduleResponse {
    pub fn new(message: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            status: StatusBlock {
                code: 200,
                message: message.into(),
                result_type: ResultType::Success,
            },
            data: ScheduleData { schedule },
        }
    }
}

impl From<Outcome> for ScheduleResponse {
    fn from(outcome: Outcome) -> Self {
        let message = outcome_message(outcome.action, outcome.written);
        Self::new(message, outcome.schedule)
    }
}

fn outcome_message(action: LifecycleAction, written: bool) -> &'static str {
    match (action, written) {
        (LifecycleAction::Pause, true) => "Schedule paused successfully",
        (LifecycleAction::Pause, false) => "Schedule already paused",
        (LifecycleAction::Resume, _) => "Schedule resumed successfully",
        (LifecycleAction::Update, _) => "Recurring schedule updated successfully",
    }
}

/// Failure envelope carrying one classified error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: StatusBlock,
    pub errors: Vec<FieldViolation>,
}

impl ErrorResponse {
    pub fn new(code: u16, message: impl Into<String>, errors: Vec<FieldViolation>) -> Self {
        Self {
            status: StatusBlock {
                code,
                message: message.into(),
                result_type: ResultType::Fail,
            },
            errors,
        }
    }
}
