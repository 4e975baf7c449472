//! Runtime configuration: environment variables plus an optional TOML
//! worker manifest.

use crate::actors::coordinator::ClassifierPolicy;
use crate::actors::specialist::analyzers::AnalyzerKind;
use crate::actors::specialist::WorkerSpec;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prefix for wire-format signal types
    pub namespace: String,
    /// How long the coordinator waits on a deep review before timing out
    pub deadline: Duration,
    /// Classification tunables
    pub policy: ClassifierPolicy,
    /// Per-topic replay ring size in the router
    pub replay_capacity: usize,
    /// When true, any missing worker result fails the task outright
    pub require_all_results: bool,
    /// Worker roster available for fan-out
    pub workers: Vec<WorkerSpec>,
}

/// One `[[workers]]` entry in the manifest file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkerEntry {
    agent_id: String,
    analyzer: AnalyzerKind,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkerManifest {
    #[serde(default)]
    workers: Vec<WorkerEntry>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let workers = match std::env::var("SYNAPSE_WORKERS_FILE") {
            Ok(path) => load_workers(&path)?,
            Err(_) => default_workers(),
        };

        Ok(Self {
            namespace: env_str("SYNAPSE_NAMESPACE", "synapse"),
            deadline: Duration::from_millis(env_parse("SYNAPSE_DEADLINE_MS", 30_000)?),
            policy: ClassifierPolicy {
                fast_path_max_files: env_parse("SYNAPSE_FAST_PATH_MAX_FILES", 2)?,
                deep_review_labels: env_csv("SYNAPSE_DEEP_REVIEW_LABELS", &["deep-review"]),
            },
            replay_capacity: env_parse("SYNAPSE_REPLAY_CAPACITY", 256)?,
            require_all_results: env_parse("SYNAPSE_REQUIRE_ALL_RESULTS", false)?,
            workers,
        })
    }
}

/// Roster used when no manifest is configured: security and style join
/// every deep review, performance only on `perf`-labeled requests.
pub fn default_workers() -> Vec<WorkerSpec> {
    vec![
        WorkerSpec::new("security", vec![], AnalyzerKind::Security.factory()),
        WorkerSpec::new("style", vec![], AnalyzerKind::Style.factory()),
        WorkerSpec::new(
            "performance",
            vec!["perf".to_string()],
            AnalyzerKind::Performance.factory(),
        ),
    ]
}

fn load_workers(path: &str) -> anyhow::Result<Vec<WorkerSpec>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read worker manifest {path}: {e}"))?;
    let manifest: WorkerManifest = toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse worker manifest {path}: {e}"))?;

    let mut workers = Vec::with_capacity(manifest.workers.len());
    for entry in manifest.workers {
        if workers
            .iter()
            .any(|w: &WorkerSpec| w.agent_id == entry.agent_id)
        {
            return Err(anyhow::anyhow!(
                "Duplicate agent_id '{}' in worker manifest {path}",
                entry.agent_id
            ));
        }
        workers.push(WorkerSpec::new(
            entry.agent_id,
            entry.labels,
            entry.analyzer.factory(),
        ));
    }
    Ok(workers)
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}
