//! Telemetry seam for pipeline lifecycle events.
//!
//! The coordinator reports task lifecycle transitions through a
//! [`TelemetrySink`] rather than logging inline, so tests can observe
//! terminal outcomes without scraping log output.

use std::sync::Arc;
use synapse_types::{SummaryStatus, TaskSummary};

/// Receives coordinator lifecycle notifications.
pub trait TelemetrySink: Send + Sync {
    fn task_started(&self, task_id: &str, workers: usize);
    fn task_finished(&self, summary: &TaskSummary);
}

/// Default sink: structured tracing events.
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn task_started(&self, task_id: &str, workers: usize) {
        tracing::info!(task_id = %task_id, workers, "task started");
    }

    fn task_finished(&self, summary: &TaskSummary) {
        match summary.status {
            SummaryStatus::Complete => tracing::info!(
                task_id = %summary.task_id,
                severity = %summary.severity,
                findings = summary.findings.len(),
                escalations = summary.escalations.len(),
                "task complete"
            ),
            SummaryStatus::Timeout => tracing::warn!(
                task_id = %summary.task_id,
                severity = %summary.severity,
                escalations = summary.escalations.len(),
                "task timed out"
            ),
            SummaryStatus::Failed => tracing::error!(
                task_id = %summary.task_id,
                escalations = summary.escalations.len(),
                "task failed"
            ),
        }
    }
}

/// Shared handle passed into the coordinator.
pub type SharedTelemetry = Arc<dyn TelemetrySink>;

pub fn tracing_telemetry() -> SharedTelemetry {
    Arc::new(TracingTelemetry)
}
