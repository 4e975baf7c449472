//! Signal router actor: schema-validated pub/sub with bounded replay.
//!
//! All signal traffic flows through here. A publish validates the
//! payload against the topic's schema, stamps the envelope, records it
//! in the topic's replay ring, and fans it out to current subscribers.
//! Subscribers whose mailbox is gone are pruned lazily during fan-out.

use crate::schema::SchemaRegistry;
use crate::signal::Signal;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::registry::RegistryMsg;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("validation failed on topic {topic}: {reason}")]
    Validation { topic: String, reason: String },

    #[error("no live worker registered as {0}")]
    WorkerNotFound(String),
}

/// Type-erased delivery handle for one subscriber.
///
/// Any actor whose message type can be built `From<Signal>` can
/// receive signals. Delivery reports whether the target mailbox is
/// still alive so the router can drop dead subscriptions.
#[derive(Clone)]
pub struct SignalRecipient {
    id: String,
    deliver: Arc<dyn Fn(Signal) -> bool + Send + Sync>,
}

impl SignalRecipient {
    pub fn new<M>(actor: &ActorRef<M>) -> Self
    where
        M: ractor::Message + From<Signal>,
    {
        let target = actor.clone();
        Self {
            id: actor.get_id().to_string(),
            deliver: Arc::new(move |signal| target.send_message(M::from(signal)).is_ok()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deliver(&self, signal: Signal) -> bool {
        (self.deliver)(signal)
    }
}

impl fmt::Debug for SignalRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRecipient").field("id", &self.id).finish()
    }
}

#[derive(Debug)]
pub enum RouterMsg {
    /// Validate and fan out, replying with the stamped envelope.
    Publish {
        topic: String,
        source: String,
        data: serde_json::Value,
        subject: Option<String>,
        correlation_id: Option<String>,
        reply: RpcReplyPort<Result<Signal, RouterError>>,
    },
    /// Fire-and-forget publish. Validation failures are logged and
    /// dropped. Safe to use from actors the router itself calls into.
    PublishAsync {
        topic: String,
        source: String,
        data: serde_json::Value,
        subject: Option<String>,
        correlation_id: Option<String>,
    },
    Subscribe {
        topic: String,
        recipient: SignalRecipient,
        reply: RpcReplyPort<Result<(), RouterError>>,
    },
    Unsubscribe {
        topic: String,
        subscriber_id: String,
    },
    /// Validate a payload as `topic` traffic and deliver the stamped
    /// envelope to exactly one registered worker, bypassing fan-out.
    CastToWorker {
        agent: String,
        topic: String,
        source: String,
        data: serde_json::Value,
        subject: Option<String>,
        correlation_id: Option<String>,
        reply: RpcReplyPort<Result<Signal, RouterError>>,
    },
    /// Most recent signals on a topic, oldest first, optionally
    /// bounded to those published at or after `since`.
    Replay {
        topic: String,
        since: Option<chrono::DateTime<chrono::Utc>>,
        limit: usize,
        reply: RpcReplyPort<Result<Vec<Signal>, RouterError>>,
    },
    SubscriberCount {
        topic: String,
        reply: RpcReplyPort<usize>,
    },
    /// Wire up the registry used for worker-targeted delivery. Sent
    /// once at bootstrap, after the registry is spawned.
    BindRegistry(ActorRef<RegistryMsg>),
}

pub struct RouterArgs {
    pub schemas: SchemaRegistry,
    pub replay_capacity: usize,
}

pub struct RouterState {
    schemas: SchemaRegistry,
    subscriptions: HashMap<String, Vec<SignalRecipient>>,
    history: HashMap<String, VecDeque<Signal>>,
    replay_capacity: usize,
    registry: Option<ActorRef<RegistryMsg>>,
}

impl RouterState {
    fn build_signal(
        &self,
        topic: &str,
        source: String,
        data: &serde_json::Value,
        subject: Option<String>,
        correlation_id: Option<String>,
    ) -> Result<Signal, RouterError> {
        let spec = self
            .schemas
            .get(topic)
            .ok_or_else(|| RouterError::UnknownTopic(topic.to_string()))?;
        let normalized = spec.validate(data).map_err(|reason| RouterError::Validation {
            topic: topic.to_string(),
            reason,
        })?;
        let mut signal = Signal::new(spec.signal_type.clone(), source, normalized);
        signal.subject = subject;
        signal.correlation_id = correlation_id;
        Ok(signal)
    }

    fn record(&mut self, topic: &str, signal: &Signal) {
        let ring = self.history.entry(topic.to_string()).or_default();
        if ring.len() == self.replay_capacity {
            ring.pop_front();
        }
        ring.push_back(signal.clone());
    }

    /// Fan out to subscribers, dropping any whose mailbox is closed.
    fn fan_out(&mut self, topic: &str, signal: &Signal) {
        let Some(recipients) = self.subscriptions.get_mut(topic) else {
            return;
        };
        let before = recipients.len();
        recipients.retain(|recipient| recipient.deliver(signal.clone()));
        let pruned = before - recipients.len();
        if pruned > 0 {
            tracing::debug!(topic = %topic, pruned, "pruned dead subscribers");
        }
    }

    fn route(
        &mut self,
        topic: &str,
        source: String,
        data: &serde_json::Value,
        subject: Option<String>,
        correlation_id: Option<String>,
    ) -> Result<Signal, RouterError> {
        let signal = self.build_signal(topic, source, data, subject, correlation_id)?;
        self.record(topic, &signal);
        self.fan_out(topic, &signal);
        Ok(signal)
    }
}

pub struct SignalRouterActor;

#[ractor::async_trait]
impl Actor for SignalRouterActor {
    type Msg = RouterMsg;
    type State = RouterState;
    type Arguments = RouterArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let topics: Vec<_> = args.schemas.topics().map(String::from).collect();
        tracing::info!(topics = ?topics, replay_capacity = args.replay_capacity, "signal router starting");
        Ok(RouterState {
            schemas: args.schemas,
            subscriptions: HashMap::new(),
            history: HashMap::new(),
            replay_capacity: args.replay_capacity.max(1),
            registry: None,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            RouterMsg::Publish {
                topic,
                source,
                data,
                subject,
                correlation_id,
                reply,
            } => {
                let result = state.route(&topic, source, &data, subject, correlation_id);
                if let Err(err) = &result {
                    tracing::warn!(topic = %topic, error = %err, "publish rejected");
                }
                let _ = reply.send(result);
            }

            RouterMsg::PublishAsync {
                topic,
                source,
                data,
                subject,
                correlation_id,
            } => {
                if let Err(err) = state.route(&topic, source, &data, subject, correlation_id) {
                    tracing::warn!(topic = %topic, error = %err, "async publish dropped");
                }
            }

            RouterMsg::Subscribe {
                topic,
                recipient,
                reply,
            } => {
                let result = if state.schemas.get(&topic).is_none() {
                    Err(RouterError::UnknownTopic(topic.clone()))
                } else {
                    let recipients = state.subscriptions.entry(topic.clone()).or_default();
                    // Re-subscribing replaces the old registration.
                    recipients.retain(|existing| existing.id() != recipient.id());
                    tracing::debug!(topic = %topic, subscriber = %recipient.id(), "subscribed");
                    recipients.push(recipient);
                    Ok(())
                };
                let _ = reply.send(result);
            }

            RouterMsg::Unsubscribe {
                topic,
                subscriber_id,
            } => {
                if let Some(recipients) = state.subscriptions.get_mut(&topic) {
                    recipients.retain(|existing| existing.id() != subscriber_id);
                }
            }

            RouterMsg::CastToWorker {
                agent,
                topic,
                source,
                data,
                subject,
                correlation_id,
                reply,
            } => {
                let result = self
                    .cast_to_worker(state, &agent, &topic, source, data, subject, correlation_id)
                    .await;
                if let Err(err) = &result {
                    tracing::warn!(agent = %agent, topic = %topic, error = %err, "worker cast failed");
                }
                let _ = reply.send(result);
            }

            RouterMsg::Replay {
                topic,
                since,
                limit,
                reply,
            } => {
                let result = if state.schemas.get(&topic).is_none() {
                    Err(RouterError::UnknownTopic(topic))
                } else {
                    let matching: Vec<Signal> = state
                        .history
                        .get(&topic)
                        .map(|ring| {
                            ring.iter()
                                .filter(|signal| {
                                    since.map_or(true, |bound| signal.timestamp >= bound)
                                })
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default();
                    let skip = matching.len().saturating_sub(limit);
                    Ok(matching.into_iter().skip(skip).collect())
                };
                let _ = reply.send(result);
            }

            RouterMsg::SubscriberCount { topic, reply } => {
                let count = state
                    .subscriptions
                    .get(&topic)
                    .map(Vec::len)
                    .unwrap_or_default();
                let _ = reply.send(count);
            }

            RouterMsg::BindRegistry(registry) => {
                state.registry = Some(registry);
            }
        }
        Ok(())
    }
}

impl SignalRouterActor {
    #[allow(clippy::too_many_arguments)]
    async fn cast_to_worker(
        &self,
        state: &mut RouterState,
        agent: &str,
        topic: &str,
        source: String,
        data: serde_json::Value,
        subject: Option<String>,
        correlation_id: Option<String>,
    ) -> Result<Signal, RouterError> {
        let signal = state.build_signal(topic, source, &data, subject, correlation_id)?;
        let registry = state
            .registry
            .as_ref()
            .ok_or_else(|| RouterError::WorkerNotFound(agent.to_string()))?;
        // The registry never calls back into the router synchronously,
        // so this round-trip cannot deadlock.
        let recipient = ractor::call!(registry, |reply| RegistryMsg::Lookup {
            agent: agent.to_string(),
            reply,
        })
        .map_err(|_| RouterError::WorkerNotFound(agent.to_string()))?
        .ok_or_else(|| RouterError::WorkerNotFound(agent.to_string()))?;

        if !recipient.deliver(signal.clone()) {
            return Err(RouterError::WorkerNotFound(agent.to_string()));
        }
        state.record(topic, &signal);
        Ok(signal)
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Publish and wait for the stamped envelope.
pub async fn publish(
    router: &ActorRef<RouterMsg>,
    topic: impl Into<String>,
    source: impl Into<String>,
    data: serde_json::Value,
) -> anyhow::Result<Signal> {
    ractor::call!(router, |reply| RouterMsg::Publish {
        topic: topic.into(),
        source: source.into(),
        data,
        subject: None,
        correlation_id: None,
        reply,
    })
    .map_err(|e| anyhow::anyhow!("router call failed: {e}"))?
    .map_err(|e| anyhow::anyhow!(e))
}

/// Subscribe an actor to a topic.
pub async fn subscribe<M>(
    router: &ActorRef<RouterMsg>,
    topic: impl Into<String>,
    actor: &ActorRef<M>,
) -> anyhow::Result<()>
where
    M: ractor::Message + From<Signal>,
{
    ractor::call!(router, |reply| RouterMsg::Subscribe {
        topic: topic.into(),
        recipient: SignalRecipient::new(actor),
        reply,
    })
    .map_err(|e| anyhow::anyhow!("router call failed: {e}"))?
    .map_err(|e| anyhow::anyhow!(e))
}
