//! Coordinator actor: classify, fan out, collect, summarize.

use super::aggregate::{summarize, FinalizeCause};
use super::classify::{classify, Classification, ClassifierPolicy};
use super::protocol::{CoordinatorError, CoordinatorMsg};
use super::state::TaskBook;
use crate::actors::recent::RecentIds;
use crate::actors::registry::{RegistryError, RegistryMsg, SpawnOutcome};
use crate::actors::router::{self, RouterMsg};
use crate::actors::specialist::WorkerSpec;
use crate::schema::SchemaRegistry;
use crate::signal::Signal;
use crate::telemetry::SharedTelemetry;
use crate::topics;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::collections::HashSet;
use std::time::Duration;
use synapse_types::{
    EscalationReason, SummaryStatus, TaskRequest, TaskResult, TaskSummary, WorkerDown,
};

const SOURCE: &str = "coordinator";

/// How many finished task ids to keep for duplicate suppression.
const COMPLETED_CAPACITY: usize = 4096;

pub struct CoordinatorArgs {
    pub router: ActorRef<RouterMsg>,
    pub registry: ActorRef<RegistryMsg>,
    pub schemas: SchemaRegistry,
    pub roster: Vec<WorkerSpec>,
    pub policy: ClassifierPolicy,
    pub deadline: Duration,
    pub require_all_results: bool,
    pub telemetry: SharedTelemetry,
}

pub struct CoordinatorState {
    router: ActorRef<RouterMsg>,
    registry: ActorRef<RegistryMsg>,
    schemas: SchemaRegistry,
    roster: Vec<WorkerSpec>,
    policy: ClassifierPolicy,
    deadline: Duration,
    require_all_results: bool,
    telemetry: SharedTelemetry,
    book: TaskBook,
    /// Recently summarized task ids, so a replayed request cannot
    /// produce a second summary. Bounded so a long-lived coordinator
    /// does not accumulate one entry per task forever.
    completed: RecentIds,
}

pub struct CoordinatorActor;

#[ractor::async_trait]
impl Actor for CoordinatorActor {
    type Msg = CoordinatorMsg;
    type State = CoordinatorState;
    type Arguments = CoordinatorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        for topic in [topics::TASK_REQUEST, topics::TASK_RESULT, topics::WORKER_DOWN] {
            router::subscribe(&args.router, topic, &myself).await?;
        }
        tracing::info!(
            roster = ?args.roster.iter().map(|w| w.agent_id.as_str()).collect::<Vec<_>>(),
            deadline_ms = args.deadline.as_millis() as u64,
            "coordinator starting"
        );
        Ok(CoordinatorState {
            router: args.router,
            registry: args.registry,
            schemas: args.schemas,
            roster: args.roster,
            policy: args.policy,
            deadline: args.deadline,
            require_all_results: args.require_all_results,
            telemetry: args.telemetry,
            book: TaskBook::new(),
            completed: RecentIds::with_capacity(COMPLETED_CAPACITY),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            CoordinatorMsg::Signal(signal) => {
                let topic = state
                    .schemas
                    .topic_for_type(&signal.signal_type)
                    .map(str::to_string);
                match topic.as_deref() {
                    Some(topics::TASK_REQUEST) => {
                        self.handle_request(&myself, state, signal).await?;
                    }
                    Some(topics::TASK_RESULT) => self.handle_result(state, signal)?,
                    Some(topics::WORKER_DOWN) => self.handle_worker_down(state, signal)?,
                    other => {
                        tracing::debug!(signal_type = %signal.signal_type, topic = ?other, "ignoring signal");
                    }
                }
            }

            CoordinatorMsg::DeadlineExpired { task_id } => {
                self.handle_deadline(state, &task_id)?;
            }

            CoordinatorMsg::GetTaskSnapshot { task_id, reply } => {
                let _ = reply.send(state.book.snapshot(&task_id));
            }
        }
        Ok(())
    }
}

impl CoordinatorActor {
    async fn handle_request(
        &self,
        myself: &ActorRef<CoordinatorMsg>,
        state: &mut CoordinatorState,
        signal: Signal,
    ) -> Result<(), ActorProcessingErr> {
        let request: TaskRequest = match signal.payload() {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable task request");
                return Ok(());
            }
        };
        let task_id = request.task_id.clone();
        if state.book.contains(&task_id) || state.completed.contains(&task_id) {
            tracing::warn!(task_id = %task_id, "duplicate task request ignored");
            return Ok(());
        }
        let correlation_id = signal
            .correlation_id
            .clone()
            .unwrap_or_else(|| signal.id.clone());

        match classify(&state.policy, &request, &state.roster) {
            Classification::FastPath => {
                tracing::info!(task_id = %task_id, "fast path");
                state.telemetry.task_started(&task_id, 0);
                let summary = fast_path_summary(&request);
                state.completed.insert(task_id);
                state.publish_summary(&correlation_id, summary)?;
            }

            Classification::DeepReview { workers } => {
                tracing::info!(
                    task_id = %task_id,
                    workers = workers.len(),
                    "deep review fan-out"
                );
                state.telemetry.task_started(&task_id, workers.len());

                let expected: HashSet<String> =
                    workers.iter().map(|w| w.agent_id.clone()).collect();
                if let Err(err) = state.book.begin(request, correlation_id.clone(), expected) {
                    tracing::warn!(task_id = %task_id, error = %err, "could not open task");
                    return Ok(());
                }

                for spec in workers {
                    let agent = spec.agent_id.clone();
                    if let Err(err) = state
                        .dispatch_to_worker(spec, &signal.data, &task_id, &correlation_id)
                        .await
                    {
                        tracing::warn!(task_id = %task_id, agent = %agent, error = %err, "dispatch failed");
                        let _ = state.book.record_escalation(
                            &task_id,
                            &agent,
                            EscalationReason::SpawnFailed,
                        );
                    }
                }

                // Every dispatch may have failed, in which case the
                // task is already settled and there is nothing to wait
                // for.
                if state.book.is_settled(&task_id) {
                    state.finalize(&task_id, FinalizeCause::Settled)?;
                } else {
                    let deadline_task = task_id.clone();
                    let _ = myself.send_after(state.deadline, move || {
                        CoordinatorMsg::DeadlineExpired {
                            task_id: deadline_task.clone(),
                        }
                    });
                }
            }
        }
        Ok(())
    }

    fn handle_result(
        &self,
        state: &mut CoordinatorState,
        signal: Signal,
    ) -> Result<(), ActorProcessingErr> {
        let result: TaskResult = match signal.payload() {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable task result");
                return Ok(());
            }
        };
        let task_id = result.task_id.clone();
        let agent = result.agent.clone();
        match state.book.record_result(result) {
            Ok(true) => state.finalize(&task_id, FinalizeCause::Settled)?,
            Ok(false) => {
                tracing::debug!(task_id = %task_id, agent = %agent, "result recorded");
            }
            Err(CoordinatorError::NotFound(_)) => {
                tracing::debug!(task_id = %task_id, agent = %agent, "late or unknown result dropped");
            }
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "result rejected");
            }
        }
        Ok(())
    }

    fn handle_worker_down(
        &self,
        state: &mut CoordinatorState,
        signal: Signal,
    ) -> Result<(), ActorProcessingErr> {
        let down: WorkerDown = match signal.payload() {
            Ok(down) => down,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable worker_down");
                return Ok(());
            }
        };
        // A worker going away mid-task is an escalation for every task
        // still waiting on it, however it went away.
        let settled = state.book.escalate_agent(&down.agent, EscalationReason::Crash);
        if !settled.is_empty() {
            tracing::warn!(agent = %down.agent, tasks = settled.len(), "worker loss settled tasks");
        }
        for task_id in settled {
            state.finalize(&task_id, FinalizeCause::Settled)?;
        }
        Ok(())
    }

    fn handle_deadline(
        &self,
        state: &mut CoordinatorState,
        task_id: &str,
    ) -> Result<(), ActorProcessingErr> {
        if !state.book.contains(task_id) {
            tracing::debug!(task_id = %task_id, "stale deadline tick");
            return Ok(());
        }
        let pending = state
            .book
            .snapshot(task_id)
            .map(|snapshot| {
                snapshot
                    .expected
                    .into_iter()
                    .filter(|agent| !snapshot.responded.contains(agent))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        tracing::warn!(task_id = %task_id, pending = ?pending, "deadline expired");
        for agent in pending {
            let _ = state
                .book
                .record_escalation(task_id, &agent, EscalationReason::Timeout);
        }
        state.finalize(task_id, FinalizeCause::DeadlineExpired)
    }
}

impl CoordinatorState {
    /// Spawn (or reuse) the worker and hand it the request directly.
    async fn dispatch_to_worker(
        &self,
        spec: WorkerSpec,
        request_data: &serde_json::Value,
        task_id: &str,
        correlation_id: &str,
    ) -> anyhow::Result<()> {
        let outcome: Result<SpawnOutcome, RegistryError> =
            ractor::call!(self.registry, |reply| RegistryMsg::GetOrSpawn {
                spec,
                reply
            })
            .map_err(|e| anyhow::anyhow!("registry call failed: {e}"))?;
        let outcome = outcome?;

        ractor::call!(self.router, |reply| RouterMsg::CastToWorker {
            agent: outcome.agent.clone(),
            topic: topics::TASK_REQUEST.to_string(),
            source: SOURCE.to_string(),
            data: request_data.clone(),
            subject: Some(task_id.to_string()),
            correlation_id: Some(correlation_id.to_string()),
            reply,
        })
        .map_err(|e| anyhow::anyhow!("router call failed: {e}"))??;
        Ok(())
    }

    fn finalize(
        &mut self,
        task_id: &str,
        cause: FinalizeCause,
    ) -> Result<(), ActorProcessingErr> {
        let Some(task) = self.book.take(task_id) else {
            return Ok(());
        };
        let correlation_id = task.correlation_id.clone();
        let summary = summarize(task, cause, self.require_all_results);
        self.completed.insert(task_id);
        self.telemetry.task_finished(&summary);
        self.publish_summary(&correlation_id, summary)
    }

    fn publish_summary(
        &self,
        correlation_id: &str,
        summary: TaskSummary,
    ) -> Result<(), ActorProcessingErr> {
        let payload = serde_json::to_value(&summary)?;
        ractor::cast!(
            self.router,
            RouterMsg::PublishAsync {
                topic: topics::TASK_SUMMARY.to_string(),
                source: SOURCE.to_string(),
                data: payload,
                subject: Some(summary.task_id.clone()),
                correlation_id: Some(correlation_id.to_string()),
            }
        )?;
        Ok(())
    }
}

/// Summary for a request that skipped fan-out entirely.
fn fast_path_summary(request: &TaskRequest) -> TaskSummary {
    let mut metadata = request.metadata.clone();
    metadata.insert("mode".to_string(), "fast_path".into());
    TaskSummary {
        task_id: request.task_id.clone(),
        status: SummaryStatus::Complete,
        severity: Default::default(),
        findings: Vec::new(),
        recommendations: Vec::new(),
        escalations: Vec::new(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::registry::{RegistryArgs, WorkerRegistryActor};
    use crate::actors::router::{RouterArgs, SignalRecipient, SignalRouterActor};
    use crate::actors::specialist::test_support::*;
    use crate::telemetry::tracing_telemetry;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use synapse_types::Severity;

    struct Collector;

    #[ractor::async_trait]
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

    /// Worker stand-in that tallies every raw request delivery per task
    /// id before answering, with no duplicate suppression of its own.
    struct CountingWorker;

    type CountingState = (ActorRef<RouterMsg>, Arc<Mutex<HashMap<String, usize>>>);

    #[ractor::async_trait]
    impl Actor for CountingWorker {
        type Msg = Signal;
        type State = CountingState;
        type Arguments = CountingState;

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
            let request: TaskRequest = msg.payload()?;
            *state
                .1
                .lock()
                .unwrap()
                .entry(request.task_id.clone())
                .or_insert(0) += 1;

            let result = TaskResult {
                task_id: request.task_id.clone(),
                agent: "counter".to_string(),
                findings: Vec::new(),
                confidence: 1.0,
                recommendations: Vec::new(),
            };
            ractor::cast!(
                state.0,
                RouterMsg::PublishAsync {
                    topic: topics::TASK_RESULT.to_string(),
                    source: "specialist:counter".to_string(),
                    data: serde_json::to_value(&result)?,
                    subject: Some(request.task_id),
                    correlation_id: msg.correlation_id.clone(),
                }
            )?;
            Ok(())
        }
    }

    struct Fixture {
        router: ActorRef<RouterMsg>,
        registry: ActorRef<RegistryMsg>,
        coordinator: ActorRef<CoordinatorMsg>,
        summaries: Arc<Mutex<Vec<Signal>>>,
    }

    async fn setup(roster: Vec<WorkerSpec>, deadline: Duration, require_all: bool) -> Fixture {
        let schemas = crate::topics::catalog("synapse").unwrap();
        let (router, _) = Actor::spawn(
            None,
            SignalRouterActor,
            RouterArgs {
                schemas: schemas.clone(),
                replay_capacity: 32,
            },
        )
        .await
        .unwrap();
        let (registry, _) = Actor::spawn(
            None,
            WorkerRegistryActor,
            RegistryArgs {
                router: router.clone(),
            },
        )
        .await
        .unwrap();
        ractor::cast!(router, RouterMsg::BindRegistry(registry.clone())).unwrap();

        let (coordinator, _) = Actor::spawn(
            None,
            CoordinatorActor,
            CoordinatorArgs {
                router: router.clone(),
                registry: registry.clone(),
                schemas,
                roster,
                policy: ClassifierPolicy::default(),
                deadline,
                require_all_results: require_all,
                telemetry: tracing_telemetry(),
            },
        )
        .await
        .unwrap();

        let summaries = Arc::new(Mutex::new(Vec::new()));
        let (collector, _) = Actor::spawn(None, Collector, summaries.clone()).await.unwrap();
        router::subscribe(&router, topics::TASK_SUMMARY, &collector)
            .await
            .unwrap();

        Fixture {
            router,
            registry,
            coordinator,
            summaries,
        }
    }

    async fn submit(fixture: &Fixture, task_id: &str, files_changed: u32, labels: &[&str]) {
        router::publish(
            &fixture.router,
            topics::TASK_REQUEST,
            "test",
            json!({
                "task_id": task_id,
                "diff": "+ let x = 1;",
                "files_changed": files_changed,
                "labels": labels,
            }),
        )
        .await
        .unwrap();
    }

    async fn wait_for_summary(
        summaries: &Arc<Mutex<Vec<Signal>>>,
        task_id: &str,
        timeout: Duration,
    ) -> Signal {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(signal) = summaries
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.data["task_id"] == task_id)
                .cloned()
            {
                return signal;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no summary for {task_id}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn small_request_completes_on_fast_path() {
        let fixture = setup(
            vec![spec_with("security", &[], instant_factory(Severity::Major))],
            Duration::from_secs(5),
            false,
        )
        .await;

        submit(&fixture, "r1", 1, &[]).await;
        let summary = wait_for_summary(&fixture.summaries, "r1", Duration::from_secs(2)).await;

        assert_eq!(summary.data["status"], "complete");
        assert_eq!(summary.data["metadata"]["mode"], "fast_path");
        assert_eq!(summary.data["findings"], json!([]));

        // No worker was spawned for a fast-path request.
        let workers =
            ractor::call!(fixture.registry, |reply| RegistryMsg::ListWorkers { reply }).unwrap();
        assert!(workers.is_empty());
    }

    #[tokio::test]
    async fn deep_review_aggregates_results_from_all_workers() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Critical)),
                spec_with("style", &[], instant_factory(Severity::Minor)),
            ],
            Duration::from_secs(5),
            false,
        )
        .await;

        submit(&fixture, "r2", 8, &[]).await;
        let summary = wait_for_summary(&fixture.summaries, "r2", Duration::from_secs(2)).await;

        assert_eq!(summary.data["status"], "complete");
        assert_eq!(summary.data["severity"], "critical");
        assert_eq!(summary.data["findings"].as_array().unwrap().len(), 2);
        assert_eq!(summary.data["metadata"]["responded"], json!(2));
        assert_eq!(summary.data["metadata"]["expected"], json!(2));
        assert_eq!(summary.data["escalations"], json!([]));
    }

    #[tokio::test]
    async fn stalled_worker_times_out_with_partial_results() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Major)),
                spec_with("slow", &[], stalled_factory()),
            ],
            Duration::from_millis(300),
            false,
        )
        .await;

        submit(&fixture, "r3", 8, &[]).await;

        // Nothing is summarized while the deadline is still running.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(fixture
            .summaries
            .lock()
            .unwrap()
            .iter()
            .all(|s| s.data["task_id"] != "r3"));

        let summary = wait_for_summary(&fixture.summaries, "r3", Duration::from_secs(3)).await;

        assert_eq!(summary.data["status"], "timeout");
        assert_eq!(summary.data["findings"].as_array().unwrap().len(), 1);
        assert_eq!(summary.data["escalations"][0]["agent"], "slow");
        assert_eq!(summary.data["escalations"][0]["reason"], "timeout");
    }

    #[tokio::test]
    async fn lost_worker_escalates_and_task_still_completes() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Minor)),
                spec_with("slow", &[], stalled_factory()),
            ],
            Duration::from_secs(10),
            false,
        )
        .await;

        submit(&fixture, "r4", 8, &[]).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        ractor::cast!(fixture.registry, RegistryMsg::Unregister {
            agent: "slow".to_string(),
        })
        .unwrap();

        let summary = wait_for_summary(&fixture.summaries, "r4", Duration::from_secs(3)).await;
        assert_eq!(summary.data["status"], "complete");
        assert_eq!(summary.data["escalations"][0]["agent"], "slow");
        assert_eq!(summary.data["escalations"][0]["reason"], "crash");
    }

    #[tokio::test]
    async fn require_all_results_fails_on_missing_worker() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Minor)),
                spec_with("slow", &[], stalled_factory()),
            ],
            Duration::from_millis(300),
            true,
        )
        .await;

        submit(&fixture, "r5", 8, &[]).await;
        let summary = wait_for_summary(&fixture.summaries, "r5", Duration::from_secs(3)).await;
        assert_eq!(summary.data["status"], "failed");
    }

    #[tokio::test]
    async fn duplicate_request_produces_single_summary() {
        let fixture = setup(vec![], Duration::from_secs(5), false).await;

        submit(&fixture, "r6", 1, &[]).await;
        wait_for_summary(&fixture.summaries, "r6", Duration::from_secs(2)).await;
        submit(&fixture, "r6", 1, &[]).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let count = fixture
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.data["task_id"] == "r6")
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn snapshot_shows_in_flight_progress() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Minor)),
                spec_with("slow", &[], stalled_factory()),
            ],
            Duration::from_secs(10),
            false,
        )
        .await;

        submit(&fixture, "r7", 8, &[]).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let snapshot = ractor::call!(fixture.coordinator, |reply| {
            CoordinatorMsg::GetTaskSnapshot {
                task_id: "r7".to_string(),
                reply,
            }
        })
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.expected, vec!["security".to_string(), "slow".to_string()]);
        assert_eq!(snapshot.responded, vec!["security".to_string()]);
    }

    #[tokio::test]
    async fn worker_receives_each_task_id_exactly_once() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Minor)),
                spec_with("counter", &[], instant_factory(Severity::Info)),
            ],
            Duration::from_secs(5),
            false,
        )
        .await;

        // Pre-register "counter" so both fan-outs dispatch to the same
        // already-running worker; its tally sees every delivery, even
        // ones its own state would otherwise deduplicate away.
        let deliveries = Arc::new(Mutex::new(HashMap::new()));
        let (counter, _) = Actor::spawn(
            None,
            CountingWorker,
            (fixture.router.clone(), deliveries.clone()),
        )
        .await
        .unwrap();
        ractor::call!(fixture.registry, |reply| RegistryMsg::Register {
            agent: "counter".to_string(),
            labels: vec![],
            recipient: SignalRecipient::new(&counter),
            cell: counter.get_cell(),
            reply,
        })
        .unwrap()
        .unwrap();

        for task_id in ["d1", "d2"] {
            submit(&fixture, task_id, 8, &[]).await;
            wait_for_summary(&fixture.summaries, task_id, Duration::from_secs(2)).await;
        }

        let deliveries = deliveries.lock().unwrap();
        assert_eq!(deliveries.get("d1"), Some(&1));
        assert_eq!(deliveries.get("d2"), Some(&1));
    }

    #[tokio::test]
    async fn undeliverable_worker_is_escalated_as_spawn_failure() {
        let fixture = setup(
            vec![
                spec_with("security", &[], instant_factory(Severity::Minor)),
                spec_with("ghost", &[], instant_factory(Severity::Info)),
            ],
            Duration::from_secs(5),
            false,
        )
        .await;

        // Register "ghost" against a mailbox that is already gone; the
        // linked cell is a live bystander so the registry keeps the
        // entry, and dispatch finds the agent but cannot deliver.
        let (dead, _) = Actor::spawn(None, Collector, Arc::new(Mutex::new(Vec::new())))
            .await
            .unwrap();
        let recipient = SignalRecipient::new(&dead);
        dead.stop(None);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (bystander, _) = Actor::spawn(None, Collector, Arc::new(Mutex::new(Vec::new())))
            .await
            .unwrap();
        ractor::call!(fixture.registry, |reply| RegistryMsg::Register {
            agent: "ghost".to_string(),
            labels: vec![],
            recipient,
            cell: bystander.get_cell(),
            reply,
        })
        .unwrap()
        .unwrap();

        submit(&fixture, "r8", 8, &[]).await;
        let summary = wait_for_summary(&fixture.summaries, "r8", Duration::from_secs(2)).await;

        assert_eq!(summary.data["status"], "complete");
        assert_eq!(summary.data["escalations"][0]["agent"], "ghost");
        assert_eq!(summary.data["escalations"][0]["reason"], "spawn_failed");
    }
}
