//! Wiring: spawn the actor system in dependency order.

use crate::actors::coordinator::{CoordinatorActor, CoordinatorArgs, CoordinatorMsg};
use crate::actors::registry::{RegistryArgs, RegistryMsg, WorkerRegistryActor};
use crate::actors::router::{RouterArgs, RouterMsg, SignalRouterActor};
use crate::config::Config;
use crate::telemetry::SharedTelemetry;
use crate::topics;
use ractor::{Actor, ActorRef};

/// Handles to the three long-lived pipeline actors.
pub struct Core {
    pub router: ActorRef<RouterMsg>,
    pub registry: ActorRef<RegistryMsg>,
    pub coordinator: ActorRef<CoordinatorMsg>,
}

impl Core {
    /// Spawn router, registry, then coordinator. Specialists are
    /// spawned lazily by the registry as reviews fan out.
    pub async fn start(config: Config, telemetry: SharedTelemetry) -> anyhow::Result<Self> {
        let schemas = topics::catalog(&config.namespace)?;

        let (router, _) = Actor::spawn(
            None,
            SignalRouterActor,
            RouterArgs {
                schemas: schemas.clone(),
                replay_capacity: config.replay_capacity,
            },
        )
        .await?;

        let (registry, _) = Actor::spawn(
            None,
            WorkerRegistryActor,
            RegistryArgs {
                router: router.clone(),
            },
        )
        .await?;
        ractor::cast!(router, RouterMsg::BindRegistry(registry.clone()))
            .map_err(|e| anyhow::anyhow!("failed to bind registry: {e}"))?;

        let (coordinator, _) = Actor::spawn(
            None,
            CoordinatorActor,
            CoordinatorArgs {
                router: router.clone(),
                registry: registry.clone(),
                schemas,
                roster: config.workers,
                policy: config.policy,
                deadline: config.deadline,
                require_all_results: config.require_all_results,
                telemetry,
            },
        )
        .await?;

        Ok(Self {
            router,
            registry,
            coordinator,
        })
    }

    /// Stop in reverse spawn order. Workers linked to the registry
    /// stop with it.
    pub fn stop(&self) {
        self.coordinator.stop(None);
        self.registry.stop(None);
        self.router.stop(None);
    }
}
