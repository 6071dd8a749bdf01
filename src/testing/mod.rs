//! Testing utilities for users of the cadence library.
//!
//! This module provides helpers for exercising lifecycle operations:
//!
//! - [`SpyScheduleRepository`]: A repository wrapper that counts reads and writes and
//!   can inject store failures or delays
//! - [`TestHarness`]: Wires an in-memory store, a spy and a controller
//! - Fixtures for recurring and one-shot schedules

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::ValidationRules;
use crate::core::callback::{Callback, EventBusCallback, HttpCallback};
use crate::core::schedule::{App, Schedule};
use crate::core::status::ScheduleStatus;
use crate::core::types::{AppId, ScheduleId};
use crate::lifecycle::LifecycleController;
use crate::metrics::LifecycleMetrics;
use crate::storage::{AppRegistry, InMemoryStorage, ScheduleRepository, StorageError};

/// How an injected store failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// The call returns an error immediately.
    Unavailable,
    /// The call never completes.
    Hang,
}

/// Failures and delays to inject into a [`SpyScheduleRepository`].
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Applied to `get_schedule`.
    pub on_read: Option<StoreFault>,
    /// Applied to both conditional writes.
    pub on_write: Option<StoreFault>,
    /// Sleep before every conditional write.
    pub write_delay: Option<Duration>,
}

impl FaultPlan {
    /// Create an empty fault plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every read.
    pub fn fail_reads(mut self, fault: StoreFault) -> Self {
        self.on_read = Some(fault);
        self
    }

    /// Fail every conditional write.
    pub fn fail_writes(mut self, fault: StoreFault) -> Self {
        self.on_write = Some(fault);
        self
    }

    /// Delay every conditional write.
    pub fn delay_writes(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }
}

/// What a [`SpyScheduleRepository`] has seen so far.
#[derive(Debug, Clone, Default)]
pub struct SpyCalls {
    pub reads: u32,
    pub status_writes: u32,
    pub full_writes: u32,
    /// The last schedule handed to a conditional write, successful or not.
    pub last_written: Option<Schedule>,
}

impl SpyCalls {
    /// Number of conditional write attempts.
    pub fn writes(&self) -> u32 {
        self.status_writes + self.full_writes
    }
}

/// A schedule repository that records calls before delegating.
pub struct SpyScheduleRepository {
    inner: Arc<dyn ScheduleRepository>,
    faults: FaultPlan,
    /// Mutex so counters stay exact under concurrent requests.
    calls: Mutex<SpyCalls>,
}

impl SpyScheduleRepository {
    /// Wrap a repository with no injected faults.
    pub fn new(inner: Arc<dyn ScheduleRepository>) -> Self {
        Self::with_faults(inner, FaultPlan::default())
    }

    /// Wrap a repository with the given fault plan.
    pub fn with_faults(inner: Arc<dyn ScheduleRepository>, faults: FaultPlan) -> Self {
        Self {
            inner,
            faults,
            calls: Mutex::new(SpyCalls::default()),
        }
    }

    /// Snapshot of the calls recorded so far.
    pub async fn calls(&self) -> SpyCalls {
        self.calls.lock().await.clone()
    }

    /// Clear every counter.
    pub async fn reset(&self) {
        *self.calls.lock().await = SpyCalls::default();
    }

    async fn before_write(&self, schedule: &Schedule) -> Result<(), StorageError> {
        self.calls.lock().await.last_written = Some(schedule.clone());
        if let Some(delay) = self.faults.write_delay {
            tokio::time::sleep(delay).await;
        }
        inject(self.faults.on_write).await
    }
}

async fn inject(fault: Option<StoreFault>) -> Result<(), StorageError> {
    match fault {
        None => Ok(()),
        Some(StoreFault::Unavailable) => Err(StorageError::Other("store unavailable".to_string())),
        Some(StoreFault::Hang) => std::future::pending().await,
    }
}

#[async_trait]
impl ScheduleRepository for SpyScheduleRepository {
    async fn save_schedule(&self, schedule: Schedule) -> Result<(), StorageError> {
        self.inner.save_schedule(schedule).await
    }

    async fn get_schedule(&self, id: &ScheduleId) -> Result<Schedule, StorageError> {
        self.calls.lock().await.reads += 1;
        inject(self.faults.on_read).await?;
        self.inner.get_schedule(id).await
    }

    async fn update_recurring_schedule_status(
        &self,
        schedule: &Schedule,
        status: ScheduleStatus,
    ) -> Result<Schedule, StorageError> {
        self.calls.lock().await.status_writes += 1;
        self.before_write(schedule).await?;
        self.inner
            .update_recurring_schedule_status(schedule, status)
            .await
    }

    async fn update_recurring_schedule(
        &self,
        schedule: &Schedule,
    ) -> Result<Schedule, StorageError> {
        self.calls.lock().await.full_writes += 1;
        self.before_write(schedule).await?;
        self.inner.update_recurring_schedule(schedule).await
    }
}

/// An in-memory store, a spy over it and a controller wired to both.
///
/// # Example
///
/// ```ignore
/// use cadence::testing::{TestHarness, recurring_schedule};
///
/// let harness = TestHarness::new();
/// let schedule = recurring_schedule("testApp");
/// harness.seed_schedule(schedule.clone()).await?;
///
/// harness.controller().pause(&schedule.schedule_id.to_string()).await?;
/// assert_eq!(harness.spy().calls().await.writes(), 1);
/// ```
pub struct TestHarness {
    storage: Arc<InMemoryStorage>,
    spy: Arc<SpyScheduleRepository>,
    controller: LifecycleController,
}

impl TestHarness {
    /// Create a harness with no faults and default rules.
    pub fn new() -> Self {
        Self::with_faults(FaultPlan::default())
    }

    /// Create a harness whose repository injects `faults`.
    pub fn with_faults(faults: FaultPlan) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let spy = Arc::new(SpyScheduleRepository::with_faults(storage.clone(), faults));
        let controller = LifecycleController::new(spy.clone(), storage.clone());
        Self {
            storage,
            spy,
            controller,
        }
    }

    /// Replace the validation rules.
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.controller = self.controller.with_rules(rules);
        self
    }

    /// Replace the storage timeout.
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.controller = self.controller.with_storage_timeout(timeout);
        self
    }

    /// Count requests into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<LifecycleMetrics>) -> Self {
        self.controller = self.controller.with_metrics(metrics);
        self
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub fn spy(&self) -> &SpyScheduleRepository {
        &self.spy
    }

    /// The backing store, bypassing the spy.
    pub fn storage(&self) -> &InMemoryStorage {
        &self.storage
    }

    /// Register an app.
    pub async fn seed_app(&self, app: App) -> Result<(), StorageError> {
        self.storage.save_app(app).await
    }

    /// Insert a schedule, registering its app if needed.
    pub async fn seed_schedule(&self, schedule: Schedule) -> Result<(), StorageError> {
        if self.storage.get_app(&schedule.app_id).await.is_err() {
            self.storage.save_app(App::new(schedule.app_id.clone())).await?;
        }
        self.storage.save_schedule(schedule).await
    }

    /// Read a schedule straight from the store.
    pub async fn stored(&self, id: &ScheduleId) -> Result<Schedule, StorageError> {
        self.storage.get_schedule(id).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// An HTTP callback with the given URL.
pub fn http_callback(url: impl Into<String>) -> Callback {
    Callback::Http(HttpCallback {
        url: url.into(),
        method: "POST".to_string(),
        headers: BTreeMap::new(),
    })
}

/// An event bus callback on the given topic.
pub fn event_bus_callback(topic: impl Into<String>) -> Callback {
    Callback::EventBus(EventBusCallback {
        topic: topic.into(),
        event_name: "schedule.fired".to_string(),
        headers: BTreeMap::new(),
    })
}

/// A daily recurring schedule in `SCHEDULED` status with an HTTP callback.
pub fn recurring_schedule(app_id: impl Into<AppId>) -> Schedule {
    Schedule::new(ScheduleId::new(), app_id)
        .with_cron("0 0 * * *")
        .with_payload(r#"{"foo":"bar"}"#)
        .with_callback(http_callback("http://example.com/hook"))
}

/// A schedule without a cron expression.
pub fn one_shot_schedule(app_id: impl Into<AppId>) -> Schedule {
    Schedule::new(ScheduleId::new(), app_id)
        .with_payload(r#"{"foo":"bar"}"#)
        .with_callback(http_callback("http://example.com/hook"))
}
