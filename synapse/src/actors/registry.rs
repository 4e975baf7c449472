//! Worker registry actor: idempotent spawning and crash monitoring.
//!
//! All worker lifecycle goes through this single actor, so concurrent
//! spawn attempts for the same agent id serialize in its mailbox and
//! exactly one caller observes `freshly_spawned`. Spawned workers are
//! supervision-linked; when one goes down the registry drops its entry
//! and announces it on the `worker_down` topic.

use crate::actors::router::{RouterMsg, SignalRecipient};
use crate::actors::specialist::{SpecialistActor, SpecialistArgs, WorkerSpec};
use crate::topics;
use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef, RpcReplyPort, SupervisionEvent};
use std::collections::HashMap;
use synapse_types::{DownReason, WorkerDown};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("agent already registered: {0}")]
    AlreadyRegistered(String),

    #[error("failed to spawn worker {agent}: {reason}")]
    SpawnFailed { agent: String, reason: String },
}

/// Result of a `GetOrSpawn` round-trip. `freshly_spawned` is true for
/// exactly one caller per live worker incarnation.
#[derive(Debug, Clone)]
pub struct SpawnOutcome {
    pub agent: String,
    pub freshly_spawned: bool,
}

#[derive(Debug, Clone)]
pub struct WorkerInfo {
    pub agent: String,
    pub labels: Vec<String>,
}

#[derive(Debug)]
pub enum RegistryMsg {
    /// Spawn the worker if absent; either way reply with its identity.
    GetOrSpawn {
        spec: WorkerSpec,
        reply: RpcReplyPort<Result<SpawnOutcome, RegistryError>>,
    },
    /// Track an externally spawned worker. Links it for supervision.
    Register {
        agent: String,
        labels: Vec<String>,
        recipient: SignalRecipient,
        cell: ActorCell,
        reply: RpcReplyPort<Result<(), RegistryError>>,
    },
    /// Stop and forget a worker. The resulting supervision event does
    /// the bookkeeping and publishes the `worker_down` announcement.
    Unregister { agent: String },
    Lookup {
        agent: String,
        reply: RpcReplyPort<Option<SignalRecipient>>,
    },
    ListWorkers { reply: RpcReplyPort<Vec<WorkerInfo>> },
}

struct WorkerHandle {
    labels: Vec<String>,
    recipient: SignalRecipient,
    cell: ActorCell,
}

pub struct RegistryArgs {
    pub router: ActorRef<RouterMsg>,
}

pub struct RegistryState {
    router: ActorRef<RouterMsg>,
    workers: HashMap<String, WorkerHandle>,
}

pub struct WorkerRegistryActor;

#[ractor::async_trait]
impl Actor for WorkerRegistryActor {
    type Msg = RegistryMsg;
    type State = RegistryState;
    type Arguments = RegistryArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("worker registry starting");
        Ok(RegistryState {
            router: args.router,
            workers: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            RegistryMsg::GetOrSpawn { spec, reply } => {
                let result = self.get_or_spawn(&myself, state, spec).await;
                let _ = reply.send(result);
            }

            RegistryMsg::Register {
                agent,
                labels,
                recipient,
                cell,
                reply,
            } => {
                let result = if state.workers.contains_key(&agent) {
                    Err(RegistryError::AlreadyRegistered(agent.clone()))
                } else {
                    cell.link(myself.get_cell());
                    tracing::info!(agent = %agent, "registered external worker");
                    state.workers.insert(
                        agent,
                        WorkerHandle {
                            labels,
                            recipient,
                            cell,
                        },
                    );
                    Ok(())
                };
                let _ = reply.send(result);
            }

            RegistryMsg::Unregister { agent } => match state.workers.get(&agent) {
                Some(handle) => {
                    tracing::info!(agent = %agent, "unregistering worker");
                    handle.cell.stop(Some("unregistered".to_string()));
                }
                None => {
                    tracing::debug!(agent = %agent, "unregister for unknown agent");
                }
            },

            RegistryMsg::Lookup { agent, reply } => {
                let recipient = state
                    .workers
                    .get(&agent)
                    .map(|handle| handle.recipient.clone());
                let _ = reply.send(recipient);
            }

            RegistryMsg::ListWorkers { reply } => {
                let mut workers: Vec<_> = state
                    .workers
                    .iter()
                    .map(|(agent, handle)| WorkerInfo {
                        agent: agent.clone(),
                        labels: handle.labels.clone(),
                    })
                    .collect();
                workers.sort_by(|a, b| a.agent.cmp(&b.agent));
                let _ = reply.send(workers);
            }
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorStarted(cell) => {
                tracing::debug!(actor_id = %cell.get_id(), "worker started");
            }

            SupervisionEvent::ActorFailed(cell, err) => {
                if let Some(agent) = state.remove_by_cell(&cell) {
                    tracing::error!(agent = %agent, error = %err, "worker crashed");
                    state.announce_down(&agent, DownReason::Crash);
                }
            }

            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                if let Some(agent) = state.remove_by_cell(&cell) {
                    tracing::info!(agent = %agent, reason = ?reason, "worker stopped");
                    state.announce_down(&agent, DownReason::Shutdown);
                }
            }

            _ => {}
        }
        Ok(())
    }
}

impl WorkerRegistryActor {
    async fn get_or_spawn(
        &self,
        myself: &ActorRef<RegistryMsg>,
        state: &mut RegistryState,
        spec: WorkerSpec,
    ) -> Result<SpawnOutcome, RegistryError> {
        if state.workers.contains_key(&spec.agent_id) {
            return Ok(SpawnOutcome {
                agent: spec.agent_id,
                freshly_spawned: false,
            });
        }

        let agent = spec.agent_id.clone();
        let args = SpecialistArgs {
            agent_id: agent.clone(),
            router: state.router.clone(),
            analyzer: (spec.factory)(),
        };
        let (worker, _) = Actor::spawn_linked(None, SpecialistActor, args, myself.get_cell())
            .await
            .map_err(|e| RegistryError::SpawnFailed {
                agent: agent.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(agent = %agent, labels = ?spec.labels, "spawned worker");
        state.workers.insert(
            agent.clone(),
            WorkerHandle {
                labels: spec.labels,
                recipient: SignalRecipient::new(&worker),
                cell: worker.get_cell(),
            },
        );
        Ok(SpawnOutcome {
            agent,
            freshly_spawned: true,
        })
    }
}

impl RegistryState {
    fn remove_by_cell(&mut self, cell: &ActorCell) -> Option<String> {
        let agent = self
            .workers
            .iter()
            .find(|(_, handle)| handle.cell.get_id() == cell.get_id())
            .map(|(agent, _)| agent.clone())?;
        self.workers.remove(&agent);
        Some(agent)
    }

    /// Fire-and-forget on purpose: the router may be mid-call into
    /// this registry, so a synchronous publish here could deadlock.
    fn announce_down(&self, agent: &str, reason: DownReason) {
        let down = WorkerDown {
            agent: agent.to_string(),
            reason,
        };
        let payload = match serde_json::to_value(&down) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(agent = %agent, error = %err, "failed to encode worker_down");
                return;
            }
        };
        let send = ractor::cast!(
            self.router,
            RouterMsg::PublishAsync {
                topic: topics::WORKER_DOWN.to_string(),
                source: "registry".to_string(),
                data: payload,
                subject: Some(agent.to_string()),
                correlation_id: None,
            }
        );
        if send.is_err() {
            tracing::warn!(agent = %agent, "router gone, dropping worker_down");
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

pub async fn get_or_spawn_worker(
    registry: &ActorRef<RegistryMsg>,
    spec: WorkerSpec,
) -> anyhow::Result<SpawnOutcome> {
    ractor::call!(registry, |reply| RegistryMsg::GetOrSpawn { spec, reply })
        .map_err(|e| anyhow::anyhow!("registry call failed: {e}"))?
        .map_err(|e| anyhow::anyhow!(e))
}

pub async fn lookup_worker(
    registry: &ActorRef<RegistryMsg>,
    agent: impl Into<String>,
) -> anyhow::Result<Option<SignalRecipient>> {
    ractor::call!(registry, |reply| RegistryMsg::Lookup {
        agent: agent.into(),
        reply,
    })
    .map_err(|e| anyhow::anyhow!("registry call failed: {e}"))
}
