//! Request outcome metrics for lifecycle operations.

use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::Arc;

use crate::core::status::LifecycleAction;

/// Whether a lifecycle request ended in a success or a failure response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    Success,
    Fail,
}

impl RequestOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestOutcome::Success => "success",
            RequestOutcome::Fail => "fail",
        }
    }
}

/// Counters for lifecycle requests, labelled by operation and outcome.
#[derive(Clone)]
pub struct LifecycleMetrics {
    registry: Arc<Registry>,
    requests: IntCounterVec,
}

impl LifecycleMetrics {
    /// Create the counters in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let requests = IntCounterVec::new(
            Opts::new(
                "cadence_lifecycle_requests_total",
                "Lifecycle requests by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        Ok(Self { registry, requests })
    }

    /// Count one finished request.
    pub fn record(&self, action: LifecycleAction, outcome: RequestOutcome) {
        self.requests
            .with_label_values(&[operation_label(action), outcome.as_str()])
            .inc();
    }

    /// Requests counted so far for one operation and outcome.
    pub fn request_count(&self, action: LifecycleAction, outcome: RequestOutcome) -> u64 {
        self.requests
            .with_label_values(&[operation_label(action), outcome.as_str()])
            .get()
    }

    /// Metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn operation_label(action: LifecycleAction) -> &'static str {
    match action {
        LifecycleAction::Pause => "pause_schedule",
        LifecycleAction::Resume => "resume_schedule",
        LifecycleAction::Update => "update_recurring_schedule",
    }
}
