//! The schedule entity and the application record that owns it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::callback::{Callback, CallbackKind};
use super::status::ScheduleStatus;
use super::types::{AppId, PartitionId, ScheduleId};

/// A recurring or one-shot job definition.
///
/// `schedule_id`, `app_id` and `partition_id` are fixed at creation. An empty
/// `cron_expression` marks a one-shot schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub schedule_id: ScheduleId,
    pub app_id: AppId,
    #[serde(default = "default_partition")]
    pub partition_id: PartitionId,
    #[serde(default)]
    pub cron_expression: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub callback: Option<Callback>,
    pub status: ScheduleStatus,
    /// Bumped by the store on every write; fences conditional writes.
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_partition() -> PartitionId {
    PartitionId::new(0)
}

impl Schedule {
    /// Create a new scheduled, one-shot schedule.
    pub fn new(schedule_id: ScheduleId, app_id: impl Into<AppId>) -> Self {
        let now = Utc::now();
        Self {
            schedule_id,
            app_id: app_id.into(),
            partition_id: default_partition(),
            cron_expression: String::new(),
            payload: String::new(),
            callback: None,
            status: ScheduleStatus::Scheduled,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the cron expression, making the schedule recurring.
    pub fn with_cron(mut self, cron_expression: impl Into<String>) -> Self {
        self.cron_expression = cron_expression.into();
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_status(mut self, status: ScheduleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_partition(mut self, partition_id: u32) -> Self {
        self.partition_id = PartitionId::new(partition_id);
        self
    }

    /// Whether the schedule fires repeatedly.
    pub fn is_recurring(&self) -> bool {
        !self.cron_expression.trim().is_empty()
    }

    pub fn callback_kind(&self) -> Option<CallbackKind> {
        self.callback.as_ref().map(Callback::kind)
    }
}

/// Registry record of an application that owns schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub app_id: AppId,
    /// Number of partitions; a schedule's partition id must be below it.
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Callback kinds the app may use. Empty allows every kind.
    #[serde(default)]
    pub allowed_callbacks: Vec<CallbackKind>,
}

fn default_partitions() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl App {
    pub fn new(app_id: impl Into<AppId>) -> Self {
        Self {
            app_id: app_id.into(),
            partitions: default_partitions(),
            active: true,
            allowed_callbacks: Vec::new(),
        }
    }

    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_allowed_callbacks(mut self, kinds: Vec<CallbackKind>) -> Self {
        self.allowed_callbacks = kinds;
        self
    }

    pub fn allows(&self, kind: CallbackKind) -> bool {
        self.allowed_callbacks.is_empty() || self.allowed_callbacks.contains(&kind)
    }
}
