//! Lifecycle tests against the SQLite backend.
//!
//! These tests run the controller over a file-backed database and verify
//! that state and fencing survive reconnecting.

use cadence::testing::recurring_schedule;
use cadence::{
    App, AppRegistry, ErrorKind, LifecycleController, LifecycleError, ScheduleRepository,
    ScheduleStatus, SqliteStorage, StorageError,
};
use std::sync::Arc;
use tempfile::TempDir;

fn controller_over(storage: Arc<SqliteStorage>) -> LifecycleController {
    LifecycleController::new(storage.clone(), storage)
}

/// Test: Pause, update and resume persist across a reconnect.
#[tokio::test]
async fn test_lifecycle_persists_across_reconnect() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cadence.db");
    let schedule = recurring_schedule("billing");
    let id = schedule.schedule_id.to_string();

    {
        let storage = Arc::new(SqliteStorage::new(&db_path).await.unwrap());
        storage.save_app(App::new("billing")).await.unwrap();
        storage.save_schedule(schedule.clone()).await.unwrap();
        let controller = controller_over(storage.clone());

        controller.pause(&id).await.unwrap();
        controller
            .update(&id, br#"{"cronExpression":"*/15 * * * *"}"#)
            .await
            .unwrap();
        storage.close().await;
    }

    let storage = Arc::new(SqliteStorage::new(&db_path).await.unwrap());
    let controller = controller_over(storage);

    let stored = controller.get(&id).await.unwrap();
    assert_eq!(stored.status, ScheduleStatus::Paused);
    assert_eq!(stored.cron_expression, "*/15 * * * *");
    assert_eq!(stored.payload, schedule.payload);
    assert_eq!(stored.callback, schedule.callback);
    assert_eq!(stored.version, 2);

    let resumed = controller.resume(&id).await.unwrap();
    assert_eq!(resumed.schedule.status, ScheduleStatus::Scheduled);
    assert_eq!(resumed.schedule.version, 3);
}

/// Test: Update followed by Get leaves unspecified fields identical.
#[tokio::test]
async fn test_update_round_trip_on_sqlite() {
    let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
    storage.save_app(App::new("billing")).await.unwrap();
    let schedule = recurring_schedule("billing");
    storage.save_schedule(schedule.clone()).await.unwrap();
    let before = storage.get_schedule(&schedule.schedule_id).await.unwrap();
    let controller = controller_over(storage);
    let id = schedule.schedule_id.to_string();

    controller
        .update(&id, br#"{"payload":"{\"a\":2}"}"#)
        .await
        .unwrap();
    let after = controller.get(&id).await.unwrap();

    assert_eq!(after.payload, "{\"a\":2}");
    assert_eq!(after.cron_expression, before.cron_expression);
    assert_eq!(after.callback, before.callback);
    assert_eq!(after.app_id, before.app_id);
    assert_eq!(after.partition_id, before.partition_id);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.version, before.version + 1);
}

/// Test: A write carrying a stale version is rejected as a persistence error.
#[tokio::test]
async fn test_stale_write_is_persistence_error() {
    let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
    storage.save_app(App::new("billing")).await.unwrap();
    let schedule = recurring_schedule("billing");
    storage.save_schedule(schedule.clone()).await.unwrap();

    let stale = storage.get_schedule(&schedule.schedule_id).await.unwrap();
    storage
        .update_recurring_schedule_status(&stale, ScheduleStatus::Paused)
        .await
        .unwrap();

    let err = storage
        .update_recurring_schedule_status(&stale, ScheduleStatus::Paused)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::VersionConflict {
            expected: 0,
            found: 1,
            ..
        }
    ));

    let lifecycle_err = LifecycleError::from(err);
    assert_eq!(lifecycle_err.kind(), ErrorKind::Persistence);
}

/// Test: App registry records are read back for validation.
#[tokio::test]
async fn test_app_rules_apply_on_sqlite() {
    let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
    storage
        .save_app(App::new("billing").with_active(false))
        .await
        .unwrap();
    let schedule = recurring_schedule("billing");
    storage.save_schedule(schedule.clone()).await.unwrap();
    let controller = controller_over(storage);

    let err = controller
        .update(&schedule.schedule_id.to_string(), b"{}")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unprocessable);
}
