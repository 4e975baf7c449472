//! Specialist worker actor.
//!
//! A specialist wraps one [`Analyzer`] behind the standard worker
//! contract: announce readiness once the loop is up, accept review
//! requests cast directly by the router, skip duplicates, and publish
//! exactly one result per distinct task id. Analysis failures become a
//! flagged `analysis_error` finding rather than a crash.

pub mod analyzers;

use crate::actors::recent::RecentIds;
use crate::actors::router::RouterMsg;
use crate::signal::Signal;
use crate::topics;
use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::fmt;
use std::sync::Arc;
use synapse_types::{Finding, TaskRequest, TaskResult, WorkerReady};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analysis failed: {0}")]
    Failed(String),
}

/// What one analyzer produced for one request.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutcome {
    pub findings: Vec<Finding>,
    pub confidence: f64,
    pub recommendations: Vec<serde_json::Value>,
}

/// The pluggable analysis strategy a specialist runs per request.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, request: &TaskRequest) -> Result<AnalyzerOutcome, AnalyzerError>;
}

pub type AnalyzerFactory = Arc<dyn Fn() -> Arc<dyn Analyzer> + Send + Sync>;

/// Everything the registry needs to spawn (or respawn) one worker.
#[derive(Clone)]
pub struct WorkerSpec {
    /// Stable logical id, e.g. `security`. Doubles as the actor's
    /// registration key.
    pub agent_id: String,
    /// Routing labels. A worker with no labels joins every deep
    /// review; a labeled worker joins only requests sharing a label.
    pub labels: Vec<String>,
    pub factory: AnalyzerFactory,
}

impl WorkerSpec {
    pub fn new(agent_id: impl Into<String>, labels: Vec<String>, factory: AnalyzerFactory) -> Self {
        Self {
            agent_id: agent_id.into(),
            labels,
            factory,
        }
    }
}

impl fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("agent_id", &self.agent_id)
            .field("labels", &self.labels)
            .finish()
    }
}

#[derive(Debug)]
pub enum SpecialistMsg {
    Signal(Signal),
    GetProcessedCount { reply: RpcReplyPort<usize> },
}

impl From<Signal> for SpecialistMsg {
    fn from(signal: Signal) -> Self {
        SpecialistMsg::Signal(signal)
    }
}

pub struct SpecialistArgs {
    pub agent_id: String,
    pub router: ActorRef<RouterMsg>,
    pub analyzer: Arc<dyn Analyzer>,
}

/// How many handled task ids to keep for duplicate suppression.
const PROCESSED_CAPACITY: usize = 4096;

pub struct SpecialistState {
    agent_id: String,
    router: ActorRef<RouterMsg>,
    analyzer: Arc<dyn Analyzer>,
    processed: RecentIds,
}

pub struct SpecialistActor;

#[async_trait]
impl Actor for SpecialistActor {
    type Msg = SpecialistMsg;
    type State = SpecialistState;
    type Arguments = SpecialistArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(SpecialistState {
            agent_id: args.agent_id,
            router: args.router,
            analyzer: args.analyzer,
            processed: RecentIds::with_capacity(PROCESSED_CAPACITY),
        })
    }

    async fn post_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        // Readiness goes out only once the mailbox is live, so a
        // request cast right after this announcement cannot be lost.
        let ready = WorkerReady {
            agent: state.agent_id.clone(),
            context: [(
                "analyzer".to_string(),
                serde_json::Value::String(state.analyzer.name().to_string()),
            )]
            .into_iter()
            .collect(),
        };
        let payload = serde_json::to_value(&ready)?;
        ractor::cast!(
            state.router,
            RouterMsg::PublishAsync {
                topic: topics::WORKER_READY.to_string(),
                source: state.source(),
                data: payload,
                subject: Some(state.agent_id.clone()),
                correlation_id: None,
            }
        )?;
        tracing::info!(agent = %state.agent_id, analyzer = %state.analyzer.name(), "specialist ready");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            SpecialistMsg::Signal(signal) => {
                let request: TaskRequest = match signal.payload() {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::debug!(
                            agent = %state.agent_id,
                            signal_type = %signal.signal_type,
                            error = %err,
                            "ignoring non-request signal"
                        );
                        return Ok(());
                    }
                };

                if !state.processed.insert(request.task_id.clone()) {
                    tracing::debug!(
                        agent = %state.agent_id,
                        task_id = %request.task_id,
                        "duplicate request skipped"
                    );
                    return Ok(());
                }

                let result = state.run_analysis(&request).await;
                state.publish_result(&signal, result)?;
            }

            SpecialistMsg::GetProcessedCount { reply } => {
                let _ = reply.send(state.processed.len());
            }
        }
        Ok(())
    }
}

impl SpecialistState {
    fn source(&self) -> String {
        format!("specialist:{}", self.agent_id)
    }

    async fn run_analysis(&self, request: &TaskRequest) -> TaskResult {
        match self.analyzer.analyze(request).await {
            Ok(outcome) => TaskResult {
                task_id: request.task_id.clone(),
                agent: self.agent_id.clone(),
                findings: outcome.findings,
                confidence: outcome.confidence,
                recommendations: outcome.recommendations,
            },
            Err(err) => {
                tracing::warn!(
                    agent = %self.agent_id,
                    task_id = %request.task_id,
                    error = %err,
                    "analysis failed"
                );
                TaskResult {
                    task_id: request.task_id.clone(),
                    agent: self.agent_id.clone(),
                    findings: vec![Finding::analysis_error(err.to_string())],
                    confidence: 0.0,
                    recommendations: Vec::new(),
                }
            }
        }
    }

    fn publish_result(
        &self,
        request_signal: &Signal,
        result: TaskResult,
    ) -> Result<(), ActorProcessingErr> {
        let correlation_id = request_signal
            .correlation_id
            .clone()
            .unwrap_or_else(|| request_signal.id.clone());
        let payload = serde_json::to_value(&result)?;
        ractor::cast!(
            self.router,
            RouterMsg::PublishAsync {
                topic: topics::TASK_RESULT.to_string(),
                source: self.source(),
                data: payload,
                subject: Some(result.task_id.clone()),
                correlation_id: Some(correlation_id),
            }
        )?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::actors::router::{self, RouterArgs, SignalRouterActor};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use synapse_types::Severity;

    struct Collector;

    #[async_trait]
    impl Actor for Collector {
        type Msg = Signal;
        type State = Arc<Mutex<Vec<Signal>>>;
        type Arguments = Arc<Mutex<Vec<Signal>>>;

        async fn pre_start(
            &self,
            _myself: ActorRef<Self::Msg>,
            args: Self::Arguments,
        ) -> Result<Self::State, ActorProcessingErr> {
            Ok(args)
        }

        async fn handle(
            &self,
            _myself: ActorRef<Self::Msg>,
            msg: Self::Msg,
            state: &mut Self::State,
        ) -> Result<(), ActorProcessingErr> {
            state.lock().unwrap().push(msg);
            Ok(())
        }
    }

    async fn setup() -> (
        ActorRef<RouterMsg>,
        ActorRef<SpecialistMsg>,
        Arc<Mutex<Vec<Signal>>>,
    ) {
        let (router, _) = Actor::spawn(
            None,
            SignalRouterActor,
            RouterArgs {
                schemas: crate::topics::catalog("synapse").unwrap(),
                replay_capacity: 16,
            },
        )
        .await
        .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let (collector, _) = Actor::spawn(None, Collector, seen.clone()).await.unwrap();
        router::subscribe(&router, topics::TASK_RESULT, &collector)
            .await
            .unwrap();
        router::subscribe(&router, topics::WORKER_READY, &collector)
            .await
            .unwrap();

        let (specialist, _) = Actor::spawn(
            None,
            SpecialistActor,
            SpecialistArgs {
                agent_id: "security".to_string(),
                router: router.clone(),
                analyzer: instant_factory(Severity::Major)(),
            },
        )
        .await
        .unwrap();

        (router, specialist, seen)
    }

    fn request_signal(task_id: &str) -> Signal {
        Signal::new(
            "synapse.task.request",
            "test",
            json!({"task_id": task_id, "diff": "+ x", "files_changed": 1, "labels": [], "metadata": {}}),
        )
    }

    #[tokio::test]
    async fn announces_ready_after_start() {
        let (_router, _specialist, seen) = setup().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let signals = seen.lock().unwrap();
        let ready: Vec<_> = signals
            .iter()
            .filter(|s| s.signal_type == "synapse.worker.ready")
            .collect();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].data["agent"], "security");
        assert_eq!(ready[0].data["context"]["analyzer"], "instant");
    }

    #[tokio::test]
    async fn publishes_one_result_per_request() {
        let (_router, specialist, seen) = setup().await;

        ractor::cast!(specialist, SpecialistMsg::Signal(request_signal("r1"))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let signals = seen.lock().unwrap();
        let results: Vec<_> = signals
            .iter()
            .filter(|s| s.signal_type == "synapse.task.result")
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data["task_id"], "r1");
        assert_eq!(results[0].data["agent"], "security");
        assert_eq!(results[0].data["findings"][0]["severity"], "major");
    }

    #[tokio::test]
    async fn duplicate_requests_are_processed_once() {
        let (_router, specialist, seen) = setup().await;

        ractor::cast!(specialist, SpecialistMsg::Signal(request_signal("r1"))).unwrap();
        ractor::cast!(specialist, SpecialistMsg::Signal(request_signal("r1"))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let processed =
            ractor::call!(specialist, |reply| SpecialistMsg::GetProcessedCount { reply }).unwrap();
        assert_eq!(processed, 1);

        let signals = seen.lock().unwrap();
        let results = signals
            .iter()
            .filter(|s| s.signal_type == "synapse.task.result")
            .count();
        assert_eq!(results, 1);
    }

    #[tokio::test]
    async fn analysis_failure_becomes_flagged_result() {
        let (router, _ok_specialist, seen) = setup().await;
        let (specialist, _) = Actor::spawn(
            None,
            SpecialistActor,
            SpecialistArgs {
                agent_id: "flaky".to_string(),
                router: router.clone(),
                analyzer: failing_factory()(),
            },
        )
        .await
        .unwrap();

        ractor::cast!(specialist, SpecialistMsg::Signal(request_signal("r9"))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let signals = seen.lock().unwrap();
        let result = signals
            .iter()
            .find(|s| s.signal_type == "synapse.task.result" && s.data["agent"] == "flaky")
            .cloned()
            .unwrap();
        assert_eq!(result.data["confidence"], json!(0.0));
        assert_eq!(result.data["findings"][0]["error"], json!(true));
        assert_eq!(result.data["findings"][0]["category"], "analysis_error");
    }

    #[tokio::test]
    async fn non_request_signals_are_ignored() {
        let (_router, specialist, seen) = setup().await;

        let stray = Signal::new("synapse.worker.down", "test", json!({"agent": "x", "reason": "crash"}));
        ractor::cast!(specialist, SpecialistMsg::Signal(stray)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let signals = seen.lock().unwrap();
        assert!(signals.iter().all(|s| s.signal_type != "synapse.task.result"));
    }
}
