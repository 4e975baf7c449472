//! Summary assembly from a settled (or expired) task.

use super::state::TaskState;
use chrono::Utc;
use synapse_types::{SummaryStatus, TaskSummary};

/// Base status of the finalization, before the terminal policy is
/// applied to escalations and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeCause {
    Settled,
    DeadlineExpired,
}

/// Collapse a task's collected results into its one summary.
///
/// Status rules, in order:
/// - escalations with zero results is a failure, whatever the cause
/// - `require_all_results` turns any escalation into a failure
/// - a deadline expiry with partial results is a timeout
/// - otherwise the task is complete (possibly with escalations noted)
///
/// Severity is the maximum across all findings; findings and
/// recommendations keep result arrival order.
pub fn summarize(task: TaskState, cause: FinalizeCause, require_all_results: bool) -> TaskSummary {
    let task_id = task.request.task_id.clone();
    let has_escalations = !task.escalations.is_empty();

    let status = if has_escalations && task.results.is_empty() {
        SummaryStatus::Failed
    } else if has_escalations && require_all_results {
        SummaryStatus::Failed
    } else if cause == FinalizeCause::DeadlineExpired {
        SummaryStatus::Timeout
    } else {
        SummaryStatus::Complete
    };

    let findings: Vec<_> = task
        .results
        .iter()
        .flat_map(|r| r.findings.iter().cloned())
        .collect();
    let recommendations: Vec<_> = task
        .results
        .iter()
        .flat_map(|r| r.recommendations.iter().cloned())
        .collect();
    let severity = findings.iter().map(|f| f.severity).max().unwrap_or_default();

    let duration_ms = (Utc::now() - task.started_at).num_milliseconds().max(0);
    let mut metadata = task.request.metadata.clone();
    metadata.insert("mode".to_string(), "deep_review".into());
    metadata.insert("duration_ms".to_string(), duration_ms.into());
    metadata.insert(
        "responded".to_string(),
        (task.results.len() as u64).into(),
    );
    metadata.insert(
        "expected".to_string(),
        (task.expected.len() as u64).into(),
    );

    TaskSummary {
        task_id,
        status,
        severity,
        findings,
        recommendations,
        escalations: task.escalations,
        metadata,
    }
}
