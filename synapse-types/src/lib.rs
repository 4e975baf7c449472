//! Wire payload types for the Synapse review pipeline
//!
//! These are the JSON-compatible payloads carried inside signal
//! envelopes on the canonical topics (`task_request`, `task_result`,
//! `worker_ready`, `worker_down`, `task_summary`). The router validates
//! every published payload by deserializing into one of these types:
//! unknown fields are rejected, defaults are applied, and the
//! re-serialized value is the normalized form that subscribers see.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form key/value metadata attached to requests and summaries.
pub type Metadata = BTreeMap<String, serde_json::Value>;

// ============================================================================
// Findings and severity
// ============================================================================

/// Severity of a single finding. Ordering matters: summary severity is
/// the maximum across all collected findings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Minor,
    Major,
    Critical,
}

/// One observation produced by a specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Finding {
    /// Short machine-readable category, e.g. `hardcoded_secret`.
    pub category: String,
    /// Human-readable description.
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    /// `true` when this finding reports a failure of the analysis
    /// itself rather than a problem in the reviewed change.
    #[serde(default)]
    pub error: bool,
}

impl Finding {
    pub fn new(
        category: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            severity,
            file: None,
            line: None,
            error: false,
        }
    }

    /// Build the finding a specialist reports when its own analysis
    /// logic failed. Kept distinct from a process crash.
    pub fn analysis_error(message: impl Into<String>) -> Self {
        Self {
            category: "analysis_error".to_string(),
            message: message.into(),
            severity: Severity::Info,
            file: None,
            line: None,
            error: true,
        }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

// ============================================================================
// Topic payloads
// ============================================================================

/// An incoming unit of work: one code-review request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskRequest {
    pub task_id: String,
    /// Unified diff of the change under review.
    pub diff: String,
    pub files_changed: u32,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One specialist's verdict for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskResult {
    pub task_id: String,
    /// Logical worker id that produced this result.
    pub agent: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
    pub confidence: f64,
    #[serde(default)]
    pub recommendations: Vec<serde_json::Value>,
}

/// Published by a specialist once its loop is up and accepting work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerReady {
    pub agent: String,
    #[serde(default)]
    pub context: Metadata,
}

/// How a tracked worker process went away.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DownReason {
    Crash,
    Shutdown,
}

/// Published by the worker registry when a monitored worker terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerDown {
    pub agent: String,
    pub reason: DownReason,
}

// ============================================================================
// Terminal summary
// ============================================================================

/// Terminal status of a task. Exactly one summary carrying one of
/// these is emitted per task id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SummaryStatus {
    Complete,
    Timeout,
    Failed,
}

/// Why a worker's contribution is missing from a summary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EscalationReason {
    Crash,
    Timeout,
    SpawnFailed,
}

/// A recorded reason why a task's result set is incomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Escalation {
    pub reason: EscalationReason,
    pub agent: String,
}

/// The single aggregated result of one review task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: SummaryStatus,
    pub severity: Severity,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub recommendations: Vec<serde_json::Value>,
    #[serde(default)]
    pub escalations: Vec<Escalation>,
    #[serde(default)]
    pub metadata: Metadata,
}
