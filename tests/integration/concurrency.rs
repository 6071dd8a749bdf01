//! Concurrent lifecycle operation tests.
//!
//! The controller holds no lock across fetch, validate and write. These
//! tests check that the conditional write keeps racing requests on one
//! schedule from both succeeding.

use cadence::testing::{FaultPlan, TestHarness, recurring_schedule};
use cadence::{ErrorKind, LifecycleError, ScheduleStatus, StorageError};
use std::time::Duration;

/// A harness whose writes wait long enough for a second request to read.
async fn racing_harness() -> (TestHarness, String) {
    let harness =
        TestHarness::with_faults(FaultPlan::new().delay_writes(Duration::from_millis(20)));
    let schedule = recurring_schedule("testApp");
    harness.seed_schedule(schedule.clone()).await.unwrap();
    (harness, schedule.schedule_id.to_string())
}

/// Test: Two concurrent pauses cannot both write.
#[tokio::test]
async fn test_concurrent_pauses_write_once() {
    let (harness, id) = racing_harness().await;
    let controller = harness.controller();

    let (first, second) = tokio::join!(controller.pause(&id), controller.pause(&id));

    let results = [first, second];
    let written = results
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if outcome.written))
        .count();
    let conflicts = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(LifecycleError::Persistence(StorageError::VersionConflict { .. }))
            )
        })
        .count();
    assert_eq!(written, 1);
    assert_eq!(conflicts, 1);

    let stored = harness.controller().get(&id).await.unwrap();
    assert_eq!(stored.status, ScheduleStatus::Paused);
    assert_eq!(stored.version, 1);
}

/// Test: A racing update and pause leave exactly one change applied.
#[tokio::test]
async fn test_update_racing_pause_applies_one() {
    let (harness, id) = racing_harness().await;
    let controller = harness.controller();

    let (updated, paused) = tokio::join!(
        controller.update(&id, br#"{"payload":"{\"raced\":true}"}"#),
        controller.pause(&id)
    );

    assert_ne!(updated.is_ok(), paused.is_ok());
    let loser = updated.err().or(paused.err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::Persistence);

    let stored = harness.controller().get(&id).await.unwrap();
    assert_eq!(stored.version, 1);
    let payload_changed = stored.payload == "{\"raced\":true}";
    let status_changed = stored.status == ScheduleStatus::Paused;
    assert!(payload_changed ^ status_changed);
}

/// Test: Operations on different schedules run independently.
#[tokio::test]
async fn test_distinct_schedules_do_not_interfere() {
    let harness = TestHarness::new();
    let mut ids = Vec::new();
    for _ in 0..16 {
        let schedule = recurring_schedule("testApp");
        ids.push(schedule.schedule_id);
        harness.seed_schedule(schedule).await.unwrap();
    }

    let mut handles = Vec::new();
    for id in &ids {
        let controller = harness.controller().clone();
        let id = id.to_string();
        handles.push(tokio::spawn(async move { controller.pause(&id).await }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.written);
    }

    for id in &ids {
        assert_eq!(
            harness.stored(id).await.unwrap().status,
            ScheduleStatus::Paused
        );
    }
    assert_eq!(harness.spy().calls().await.status_writes, 16);
}

/// Test: A stale pause after a completed resume is reported, not retried.
#[tokio::test]
async fn test_conflict_is_not_retried() {
    let (harness, id) = racing_harness().await;
    harness.controller().pause(&id).await.unwrap();
    harness.spy().reset().await;

    let controller = harness.controller();
    let (resumed, updated) = tokio::join!(
        controller.resume(&id),
        controller.update(&id, br#"{"cronExpression":"*/10 * * * *"}"#)
    );

    assert_ne!(resumed.is_ok(), updated.is_ok());
    let calls = harness.spy().calls().await;
    assert_eq!(calls.writes(), 2);
    assert_eq!(calls.reads, 2);
}
