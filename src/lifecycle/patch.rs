//! Partial update requests for recurring schedules.
//!
//! Every field carries a presence bit. An absent field leaves the stored
//! value unchanged. A zero value (empty string, nil UUID, partition 0,
//! `null`) is treated the same as an absent field, so a patch can never
//! clear a cron expression, payload or app id.

use serde::Deserialize;
use serde_json::Value;

use super::error::LifecycleError;
use crate::core::types::{AppId, PartitionId, ScheduleId};

/// Patch applied by an update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePatch {
    /// Immutable; must match the stored value when present.
    pub schedule_id: Option<ScheduleId>,
    /// Immutable; must match the stored value when present.
    pub app_id: Option<AppId>,
    /// Immutable; must match the stored value when present.
    pub partition_id: Option<PartitionId>,
    pub cron_expression: Option<String>,
    pub payload: Option<String>,
    /// Raw callback, decoded during the merge.
    pub callback: Option<Value>,
}

impl SchedulePatch {
    /// Decode a patch from a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self, LifecycleError> {
        serde_json::from_slice(body).map_err(|e| LifecycleError::MalformedBody(e.to_string()))
    }

    pub fn with_cron(mut self, cron_expression: impl Into<String>) -> Self {
        self.cron_expression = Some(cron_expression.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_callback(mut self, callback: Value) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<AppId>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_schedule_id(mut self, schedule_id: ScheduleId) -> Self {
        self.schedule_id = Some(schedule_id);
        self
    }

    pub fn with_partition_id(mut self, partition_id: u32) -> Self {
        self.partition_id = Some(PartitionId::new(partition_id));
        self
    }

    /// The requested schedule id; the nil UUID counts as absent.
    pub fn requested_schedule_id(&self) -> Option<ScheduleId> {
        self.schedule_id.filter(|id| !id.is_nil())
    }

    pub fn requested_app_id(&self) -> Option<&AppId> {
        self.app_id.as_ref().filter(|id| !id.is_empty())
    }

    /// The requested partition; partition 0 counts as absent.
    pub fn requested_partition_id(&self) -> Option<PartitionId> {
        self.partition_id.filter(|partition| partition.get() != 0)
    }

    pub fn requested_cron(&self) -> Option<&str> {
        non_empty(self.cron_expression.as_deref())
    }

    pub fn requested_payload(&self) -> Option<&str> {
        non_empty(self.payload.as_deref())
    }

    /// The raw callback; JSON `null` counts as absent.
    pub fn requested_callback(&self) -> Option<&Value> {
        self.callback.as_ref().filter(|v| !v.is_null())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
