//! Actor implementations: router, registry, specialists, coordinator.

pub mod coordinator;
pub mod recent;
pub mod registry;
pub mod router;
pub mod specialist;
