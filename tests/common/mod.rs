//! Common test utilities shared across integration tests.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use cadence::api::{build_router, create_api_state};
use cadence::testing::{TestHarness, recurring_schedule};
use cadence::Schedule;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// A harness seeded with one daily recurring schedule owned by `testApp`.
pub async fn harness_with_recurring() -> (TestHarness, Schedule) {
    let harness = TestHarness::new();
    let schedule = recurring_schedule("testApp");
    harness.seed_schedule(schedule.clone()).await.unwrap();
    (harness, schedule)
}

/// Build a router over the harness controller.
pub fn router_for(harness: &TestHarness) -> Router {
    build_router(create_api_state(harness.controller().clone()))
}

/// Send one request and decode the JSON response body.
pub async fn send(router: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}
