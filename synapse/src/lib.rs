//! Synapse: signal-based coordination for parallel code review.
//!
//! Four actors make up the pipeline:
//! - [`actors::router::SignalRouterActor`]: schema-validated pub/sub
//!   with bounded replay
//! - [`actors::registry::WorkerRegistryActor`]: idempotent worker
//!   spawning and crash monitoring
//! - [`actors::specialist::SpecialistActor`]: one analyzer behind the
//!   worker contract
//! - [`actors::coordinator::CoordinatorActor`]: classification,
//!   fan-out, deadlines, and aggregation into one summary per task
//!
//! [`Core::start`] wires them together from a [`Config`].

pub mod actors;
pub mod bootstrap;
pub mod config;
pub mod schema;
pub mod signal;
pub mod telemetry;
pub mod topics;

pub use actors::{coordinator, registry, router, specialist};
pub use bootstrap::Core;
pub use config::Config;
pub use signal::Signal;
