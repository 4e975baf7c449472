//! Coordinator: the review-pipeline state machine.
//!
//! Listens to `task_request`, classifies each request, fans deep
//! reviews out to registered specialists, tracks results, escalations
//! and deadlines per task, and publishes exactly one `task_summary`
//! per task id.

mod actor;
mod aggregate;
mod classify;
mod protocol;
mod state;

pub use actor::{CoordinatorActor, CoordinatorArgs};
pub use aggregate::{summarize, FinalizeCause};
pub use classify::{classify, Classification, ClassifierPolicy};
pub use protocol::{CoordinatorError, CoordinatorMsg, TaskSnapshot};
pub use state::{TaskBook, TaskState};
