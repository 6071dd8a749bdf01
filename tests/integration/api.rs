//! API integration tests.
//!
//! These tests verify the HTTP routes, status codes and response envelopes.

use crate::common::{harness_with_recurring, router_for, send};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use cadence::api::{build_router, create_api_state};
use cadence::testing::{FaultPlan, StoreFault, TestHarness, one_shot_schedule, recurring_schedule};
use cadence::{LifecycleMetrics, ScheduleId, ScheduleStatus};
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

/// Test: Health endpoint responds with status ok.
#[tokio::test]
async fn test_health_endpoint() {
    let harness = TestHarness::new();

    let (status, json) = send(router_for(&harness), Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

/// Test: Pause returns the paused schedule in a success envelope.
#[tokio::test]
async fn test_pause_endpoint() {
    let (harness, schedule) = harness_with_recurring().await;
    let uri = format!("/api/schedules/{}/pause", schedule.schedule_id);

    let (status, json) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["status"],
        json!({"code": 200, "message": "Schedule paused successfully", "type": "SUCCESS"})
    );
    assert_eq!(
        json["data"]["schedule"]["scheduleId"],
        schedule.schedule_id.to_string()
    );
    assert_eq!(json["data"]["schedule"]["status"], "PAUSED");
}

/// Test: Pausing an already paused schedule answers 200 without writing.
#[tokio::test]
async fn test_pause_already_paused_endpoint() {
    let harness = TestHarness::new();
    let schedule = recurring_schedule("testApp").with_status(ScheduleStatus::Paused);
    harness.seed_schedule(schedule.clone()).await.unwrap();
    let uri = format!("/api/schedules/{}/pause", schedule.schedule_id);

    let (status, json) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"]["message"], "Schedule already paused");
    assert_eq!(json["data"]["schedule"]["status"], "PAUSED");
    assert_eq!(harness.spy().calls().await.writes(), 0);
}

/// Test: Resume after pause returns the schedule to SCHEDULED.
#[tokio::test]
async fn test_resume_endpoint() {
    let (harness, schedule) = harness_with_recurring().await;
    let router = router_for(&harness);
    let base = format!("/api/schedules/{}", schedule.schedule_id);

    send(router.clone(), Method::PUT, &format!("{base}/pause"), None).await;
    let (status, json) = send(router, Method::PUT, &format!("{base}/resume"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"]["message"], "Schedule resumed successfully");
    assert_eq!(json["data"]["schedule"]["status"], "SCHEDULED");
}

/// Test: Resume on a non-paused schedule answers 409 in a failure envelope.
#[tokio::test]
async fn test_resume_non_paused_is_conflict() {
    let (harness, schedule) = harness_with_recurring().await;
    let uri = format!("/api/schedules/{}/resume", schedule.schedule_id);

    let (status, json) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"]["code"], 409);
    assert_eq!(json["status"]["type"], "FAIL");
    assert!(json["errors"].as_array().unwrap().is_empty());
    assert_eq!(harness.spy().calls().await.writes(), 0);
}

/// Test: Malformed identifiers answer 400 on every route.
#[tokio::test]
async fn test_invalid_id_is_bad_request() {
    let harness = TestHarness::new();

    for (method, uri) in [
        (Method::PUT, "/api/schedules/not-a-valid-uuid/pause"),
        (Method::PUT, "/api/schedules/not-a-valid-uuid/resume"),
        (Method::GET, "/api/schedules/not-a-valid-uuid"),
    ] {
        let (status, json) = send(router_for(&harness), method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["status"]["type"], "FAIL");
    }
}

/// Test: An identifier padded with whitespace is not a valid identifier.
#[tokio::test]
async fn test_padded_id_is_bad_request() {
    let (harness, schedule) = harness_with_recurring().await;
    let uri = format!("/api/schedules/%20{}%20/pause", schedule.schedule_id);

    let (status, _) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.spy().calls().await.reads, 0);
}

/// Test: The identifier is checked before the body.
#[tokio::test]
async fn test_update_invalid_id_reported_before_body() {
    let harness = TestHarness::new();

    let (status, json) = send(
        router_for(&harness),
        Method::PATCH,
        "/api/schedules/not-a-valid-uuid",
        Some("{broken"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["status"]["message"]
            .as_str()
            .unwrap()
            .contains("invalid schedule id")
    );
}

/// Test: Unknown identifiers answer 404.
#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let (harness, _) = harness_with_recurring().await;
    let uri = format!("/api/schedules/{}/pause", ScheduleId::new());

    let (status, json) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"]["code"], 404);
}

/// Test: One-shot schedules answer 422.
#[tokio::test]
async fn test_one_shot_is_unprocessable() {
    let harness = TestHarness::new();
    let schedule = one_shot_schedule("testApp");
    harness.seed_schedule(schedule.clone()).await.unwrap();
    let uri = format!("/api/schedules/{}/pause", schedule.schedule_id);

    let (status, _) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

/// Test: Update merges the requested fields and reports success.
#[tokio::test]
async fn test_update_endpoint() {
    let (harness, schedule) = harness_with_recurring().await;
    let uri = format!("/api/schedules/{}", schedule.schedule_id);

    let (status, json) = send(
        router_for(&harness),
        Method::PATCH,
        &uri,
        Some(r#"{"cronExpression":"*/1 * * * *"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["status"]["message"],
        "Recurring schedule updated successfully"
    );
    assert_eq!(json["data"]["schedule"]["cronExpression"], "*/1 * * * *");
    assert_eq!(json["data"]["schedule"]["payload"], schedule.payload);
}

/// Test: Update then GET returns the merged schedule.
#[tokio::test]
async fn test_update_then_get() {
    let (harness, schedule) = harness_with_recurring().await;
    let router = router_for(&harness);
    let uri = format!("/api/schedules/{}", schedule.schedule_id);

    send(
        router.clone(),
        Method::PATCH,
        &uri,
        Some(r#"{"payload":"{\"a\":2}"}"#),
    )
    .await;
    let (status, json) = send(router, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"]["message"], "Schedule fetched successfully");
    assert_eq!(json["data"]["schedule"]["payload"], "{\"a\":2}");
    assert_eq!(
        json["data"]["schedule"]["cronExpression"],
        schedule.cron_expression
    );
    assert_eq!(json["data"]["schedule"]["callback"]["type"], "http");
}

/// Test: Immutable-field mismatches answer 400 and list each field.
#[tokio::test]
async fn test_update_immutable_fields_is_bad_request() {
    let (harness, schedule) = harness_with_recurring().await;
    let uri = format!("/api/schedules/{}", schedule.schedule_id);

    let (status, json) = send(
        router_for(&harness),
        Method::PATCH,
        &uri,
        Some(r#"{"appId":"B","cronExpression":"*/5 * * * *"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"][0]["field"], "appId");
    assert_eq!(harness.spy().calls().await.writes(), 0);
}

/// Test: Business validation failures answer 422 with every violation.
#[tokio::test]
async fn test_update_validation_is_unprocessable() {
    let (harness, schedule) = harness_with_recurring().await;
    let uri = format!("/api/schedules/{}", schedule.schedule_id);
    let body = json!({
        "cronExpression": "not a cron",
        "callback": {"type": "http", "details": {"url": "ftp://example.com"}},
    })
    .to_string();

    let (status, json) = send(
        router_for(&harness),
        Method::PATCH,
        &uri,
        Some(body.as_str()),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["cronExpression", "callback.details.url"]);
}

/// Test: Store failures answer 500.
#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let harness = TestHarness::with_faults(FaultPlan::new().fail_writes(StoreFault::Unavailable));
    let schedule = recurring_schedule("testApp");
    harness.seed_schedule(schedule.clone()).await.unwrap();
    let uri = format!("/api/schedules/{}/pause", schedule.schedule_id);

    let (status, json) = send(router_for(&harness), Method::PUT, &uri, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"]["code"], 500);
    assert_eq!(
        harness.stored(&schedule.schedule_id).await.unwrap().status,
        ScheduleStatus::Scheduled
    );
}

/// Test: The metrics endpoint reports request outcomes per operation.
#[tokio::test]
async fn test_metrics_endpoint_counts_outcomes() {
    let harness = TestHarness::new().with_metrics(Arc::new(LifecycleMetrics::new().unwrap()));
    let schedule = recurring_schedule("testApp");
    harness.seed_schedule(schedule.clone()).await.unwrap();
    let router = build_router(create_api_state(harness.controller().clone()));
    let base = format!("/api/schedules/{}", schedule.schedule_id);

    send(router.clone(), Method::PUT, &format!("{base}/pause"), None).await;
    send(router.clone(), Method::PUT, &format!("{base}/pause"), None).await;
    send(router.clone(), Method::PUT, "/api/schedules/not-a-valid-uuid/resume", None).await;

    let request = Request::builder()
        .uri("/api/metrics")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains(
        r#"cadence_lifecycle_requests_total{operation="pause_schedule",outcome="success"} 2"#
    ));
    assert!(text.contains(
        r#"cadence_lifecycle_requests_total{operation="resume_schedule",outcome="fail"} 1"#
    ));
}
