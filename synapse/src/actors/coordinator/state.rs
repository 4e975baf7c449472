//! Per-task bookkeeping for the coordinator.
//!
//! A task is "settled" once every expected agent is accounted for,
//! either by a result or by an escalation. All mutation goes through
//! [`TaskBook`] so the settlement rule lives in one place.

use super::protocol::{CoordinatorError, TaskSnapshot};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use synapse_types::{Escalation, EscalationReason, TaskRequest, TaskResult};

#[derive(Debug)]
pub struct TaskState {
    pub request: TaskRequest,
    pub correlation_id: String,
    pub expected: HashSet<String>,
    /// Results in arrival order; summary findings keep this order.
    pub results: Vec<TaskResult>,
    pub escalations: Vec<Escalation>,
    pub started_at: DateTime<Utc>,
}

impl TaskState {
    fn responded(&self) -> HashSet<&str> {
        self.results
            .iter()
            .map(|r| r.agent.as_str())
            .chain(self.escalations.iter().map(|e| e.agent.as_str()))
            .collect()
    }

    /// Agents still owing a result.
    pub fn pending(&self) -> Vec<String> {
        let responded = self.responded();
        let mut pending: Vec<String> = self
            .expected
            .iter()
            .filter(|agent| !responded.contains(agent.as_str()))
            .cloned()
            .collect();
        pending.sort();
        pending
    }

    pub fn is_settled(&self) -> bool {
        self.pending().is_empty()
    }
}

/// All in-flight tasks.
#[derive(Debug, Default)]
pub struct TaskBook {
    tasks: HashMap<String, TaskState>,
}

impl TaskBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &mut self,
        request: TaskRequest,
        correlation_id: String,
        expected: HashSet<String>,
    ) -> Result<(), CoordinatorError> {
        let task_id = request.task_id.clone();
        if self.tasks.contains_key(&task_id) {
            return Err(CoordinatorError::DuplicateTask(task_id));
        }
        self.tasks.insert(
            task_id,
            TaskState {
                request,
                correlation_id,
                expected,
                results: Vec::new(),
                escalations: Vec::new(),
                started_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn is_settled(&self, task_id: &str) -> bool {
        self.tasks
            .get(task_id)
            .map(TaskState::is_settled)
            .unwrap_or(false)
    }

    /// Record one agent's result. Returns whether the task is now
    /// settled. A result from an agent that already responded (or was
    /// never expected) is dropped.
    pub fn record_result(&mut self, result: TaskResult) -> Result<bool, CoordinatorError> {
        let task = self
            .tasks
            .get_mut(&result.task_id)
            .ok_or_else(|| CoordinatorError::NotFound(result.task_id.clone()))?;
        let accepted = task.expected.contains(&result.agent)
            && !task.responded().contains(result.agent.as_str());
        if accepted {
            task.results.push(result);
        }
        Ok(task.is_settled())
    }

    /// Mark one agent of one task as escalated. Returns whether the
    /// task is now settled.
    pub fn record_escalation(
        &mut self,
        task_id: &str,
        agent: &str,
        reason: EscalationReason,
    ) -> Result<bool, CoordinatorError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoordinatorError::NotFound(task_id.to_string()))?;
        if task.expected.contains(agent) && !task.responded().contains(agent) {
            task.escalations.push(Escalation {
                reason,
                agent: agent.to_string(),
            });
        }
        Ok(task.is_settled())
    }

    /// Escalate one agent across every task still waiting on it.
    /// Returns the ids of tasks that became settled.
    pub fn escalate_agent(&mut self, agent: &str, reason: EscalationReason) -> Vec<String> {
        let mut settled = Vec::new();
        for (task_id, task) in self.tasks.iter_mut() {
            if task.expected.contains(agent) && !task.responded().contains(agent) {
                let was_settled = task.is_settled();
                task.escalations.push(Escalation {
                    reason,
                    agent: agent.to_string(),
                });
                if !was_settled && task.is_settled() {
                    settled.push(task_id.clone());
                }
            }
        }
        settled.sort();
        settled
    }

    /// Close out a task, taking its state. Finalization happens at
    /// most once per task id because the entry is gone afterwards.
    pub fn take(&mut self, task_id: &str) -> Option<TaskState> {
        self.tasks.remove(task_id)
    }

    pub fn snapshot(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.tasks.get(task_id).map(|task| {
            let mut expected: Vec<String> = task.expected.iter().cloned().collect();
            expected.sort();
            let mut responded: Vec<String> =
                task.results.iter().map(|r| r.agent.clone()).collect();
            responded.sort();
            TaskSnapshot {
                task_id: task_id.to_string(),
                expected,
                responded,
                escalations: task.escalations.len(),
            }
        })
    }
}
