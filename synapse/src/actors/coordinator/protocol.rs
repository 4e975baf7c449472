//! Coordinator message protocol and errors.

use crate::signal::Signal;
use ractor::RpcReplyPort;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinatorError {
    #[error("task already in flight: {0}")]
    DuplicateTask(String),

    #[error("no open task: {0}")]
    NotFound(String),
}

/// Progress view of one in-flight task, for operators and tests.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub expected: Vec<String>,
    pub responded: Vec<String>,
    pub escalations: usize,
}

#[derive(Debug)]
pub enum CoordinatorMsg {
    /// Subscribed signal traffic: requests, results, worker-down.
    Signal(Signal),
    /// Self-scheduled deadline tick. Stale ticks (task already
    /// settled) are ignored.
    DeadlineExpired { task_id: String },
    GetTaskSnapshot {
        task_id: String,
        reply: RpcReplyPort<Option<TaskSnapshot>>,
    },
}

impl From<Signal> for CoordinatorMsg {
    fn from(signal: Signal) -> Self {
        CoordinatorMsg::Signal(signal)
    }
}
