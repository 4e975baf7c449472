//! Canonical topic catalog for the review pipeline.

use crate::schema::{SchemaError, SchemaRegistry, TopicSpec};
use synapse_types::{TaskRequest, TaskResult, TaskSummary, WorkerDown, WorkerReady};

pub const TASK_REQUEST: &str = "task_request";
pub const TASK_RESULT: &str = "task_result";
pub const WORKER_READY: &str = "worker_ready";
pub const WORKER_DOWN: &str = "worker_down";
pub const TASK_SUMMARY: &str = "task_summary";

/// Build the canonical schema registry, with wire-format type strings
/// namespaced under `ns` (e.g. `synapse.task.request`).
pub fn catalog(ns: &str) -> Result<SchemaRegistry, SchemaError> {
    let mut registry = SchemaRegistry::new();
    registry.register(TopicSpec::typed::<TaskRequest>(
        TASK_REQUEST,
        format!("{ns}.task.request"),
    ))?;
    registry.register(TopicSpec::typed::<TaskResult>(
        TASK_RESULT,
        format!("{ns}.task.result"),
    ))?;
    registry.register(TopicSpec::typed::<WorkerReady>(
        WORKER_READY,
        format!("{ns}.worker.ready"),
    ))?;
    registry.register(TopicSpec::typed::<WorkerDown>(
        WORKER_DOWN,
        format!("{ns}.worker.down"),
    ))?;
    registry.register(TopicSpec::typed::<TaskSummary>(
        TASK_SUMMARY,
        format!("{ns}.task.summary"),
    ))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_registers_all_topics() {
        let registry = catalog("synapse").unwrap();
        for topic in [TASK_REQUEST, TASK_RESULT, WORKER_READY, WORKER_DOWN, TASK_SUMMARY] {
            assert!(registry.get(topic).is_some(), "missing {topic}");
        }
        assert_eq!(
            registry.topic_for_type("synapse.task.summary"),
            Some(TASK_SUMMARY)
        );
    }

    #[test]
    fn catalog_respects_namespace() {
        let registry = catalog("review").unwrap();
        assert_eq!(
            registry.get(TASK_REQUEST).unwrap().signal_type,
            "review.task.request"
        );
    }
}
