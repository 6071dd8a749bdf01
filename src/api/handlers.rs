//! API request handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::lifecycle::LifecycleController;

use super::errors::ApiError;
use super::responses::{HealthResponse, ScheduleResponse};

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<LifecycleController>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Lifecycle request counters in the Prometheus text format.
pub async fn metrics(State(state): State<ApiState>) -> Result<String, ApiError> {
    match state.controller.metrics() {
        Some(metrics) => metrics
            .render()
            .map_err(|e| ApiError::Internal(format!("failed to render metrics: {e}"))),
        None => Ok(String::new()),
    }
}

/// Fetch a schedule.
pub async fn get_schedule(
    State(state): State<ApiState>,
    Path(schedule_id): Path<String>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let schedule = state.controller.get(&schedule_id).await?;
    Ok(Json(ScheduleResponse::new(
        "Schedule fetched successfully",
        schedule,
    )))
}

/// Pause a recurring schedule.
pub async fn pause_schedule(
    State(state): State<ApiState>,
    Path(schedule_id): Path<String>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let outcome = state.controller.pause(&schedule_id).await?;
    Ok(Json(outcome.into()))
}

/// Resume a paused recurring schedule.
pub async fn resume_schedule(
    State(state): State<ApiState>,
    Path(schedule_id): Path<String>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let outcome = state.controller.resume(&schedule_id).await?;
    Ok(Json(outcome.into()))
}

/// Apply a partial update to a recurring schedule.
///
/// The body is taken raw so a bad identifier is reported before a bad body.
pub async fn update_schedule(
    State(state): State<ApiState>,
    Path(schedule_id): Path<String>,
    body: Bytes,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let outcome = state.controller.update(&schedule_id, &body).await?;
    Ok(Json(outcome.into()))
}
