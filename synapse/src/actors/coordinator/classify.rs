//! Request classification: fast path or deep review, and which
//! workers join the fan-out.

use crate::actors::specialist::WorkerSpec;
use synapse_types::TaskRequest;

/// Tunables for the classification decision.
#[derive(Debug, Clone)]
pub struct ClassifierPolicy {
    /// A request touching at most this many files takes the fast path
    /// unless a label forces a deep review.
    pub fast_path_max_files: u32,
    /// Labels that force a deep review regardless of size.
    pub deep_review_labels: Vec<String>,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            fast_path_max_files: 2,
            deep_review_labels: vec!["deep-review".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub enum Classification {
    /// Summarize immediately, no workers involved.
    FastPath,
    /// Fan out to these workers and aggregate.
    DeepReview { workers: Vec<WorkerSpec> },
}

/// Decide how to run a request against the configured worker roster.
///
/// Unlabeled workers join every deep review; labeled workers join only
/// when they share a label with the request. An eligible set that
/// comes up empty degrades to the fast path.
pub fn classify(
    policy: &ClassifierPolicy,
    request: &TaskRequest,
    roster: &[WorkerSpec],
) -> Classification {
    let forced_deep = request
        .labels
        .iter()
        .any(|label| policy.deep_review_labels.contains(label));
    if !forced_deep && request.files_changed <= policy.fast_path_max_files {
        return Classification::FastPath;
    }

    let workers: Vec<WorkerSpec> = roster
        .iter()
        .filter(|spec| {
            spec.labels.is_empty()
                || spec.labels.iter().any(|label| request.labels.contains(label))
        })
        .cloned()
        .collect();

    if workers.is_empty() {
        Classification::FastPath
    } else {
        Classification::DeepReview { workers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::specialist::test_support::{instant_factory, spec_with};
    use synapse_types::Severity;

    fn request(files_changed: u32, labels: &[&str]) -> TaskRequest {
        TaskRequest {
            task_id: "r1".to_string(),
            diff: String::new(),
            files_changed,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            metadata: Default::default(),
        }
    }

    fn roster() -> Vec<WorkerSpec> {
        vec![
            spec_with("security", &[], instant_factory(Severity::Info)),
            spec_with("style", &[], instant_factory(Severity::Info)),
            spec_with("performance", &["perf"], instant_factory(Severity::Info)),
        ]
    }

    #[test]
    fn small_change_takes_fast_path() {
        let decision = classify(&ClassifierPolicy::default(), &request(2, &[]), &roster());
        assert!(matches!(decision, Classification::FastPath));
    }

    #[test]
    fn large_change_fans_out_to_unlabeled_workers() {
        let decision = classify(&ClassifierPolicy::default(), &request(5, &[]), &roster());
        let Classification::DeepReview { workers } = decision else {
            panic!("expected deep review");
        };
        let agents: Vec<_> = workers.iter().map(|w| w.agent_id.as_str()).collect();
        assert_eq!(agents, vec!["security", "style"]);
    }

    #[test]
    fn matching_label_pulls_in_labeled_worker() {
        let decision = classify(&ClassifierPolicy::default(), &request(5, &["perf"]), &roster());
        let Classification::DeepReview { workers } = decision else {
            panic!("expected deep review");
        };
        assert!(workers.iter().any(|w| w.agent_id == "performance"));
    }

    #[test]
    fn deep_review_label_overrides_size() {
        let decision = classify(
            &ClassifierPolicy::default(),
            &request(1, &["deep-review"]),
            &roster(),
        );
        assert!(matches!(decision, Classification::DeepReview { .. }));
    }

    #[test]
    fn empty_roster_degrades_to_fast_path() {
        let decision = classify(&ClassifierPolicy::default(), &request(10, &[]), &[]);
        assert!(matches!(decision, Classification::FastPath));
    }
}
