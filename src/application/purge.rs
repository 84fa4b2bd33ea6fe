use super::repository::DomainRepository;
use crate::domain::ports::{CallOutcome, RpcTransportBox};
use crate::domain::repository::{Commit, VersionSelector};
use crate::error::{OpsError, Result};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// The repository holds no objects any more.
    Completed,
    /// The attempt budget ran out while objects remained.
    Exhausted,
}

/// Counters of one checkout-and-remove pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptStats {
    pub attempt: u32,
    pub version: u64,
    pub objects: usize,
    pub removed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub outcome: PurgeOutcome,
    /// Objects removed over the whole invocation.
    pub removed: u64,
    pub budget: u32,
    pub attempts: Vec<AttemptStats>,
    /// Locally tracked version after the last accepted commit.
    pub expected_version: u64,
}

impl PurgeReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == PurgeOutcome::Completed
    }
}

impl fmt::Display for PurgeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Removed {} objects", self.removed)?;
        match self.outcome {
            PurgeOutcome::Completed => write!(f, "All objects removed, purge ok"),
            PurgeOutcome::Exhausted => write!(
                f,
                "Domain config purge hasn't been finished completely in {} attempts",
                self.budget
            ),
        }
    }
}

#[derive(Debug, Default)]
struct PurgeState {
    expected_version: u64,
    removed: u64,
    attempts_used: u32,
}

/// Empties the domain config repository by removing its objects one commit at a time.
///
/// Every attempt checks out the head snapshot and commits one removal per
/// object, in snapshot order. The expected version is advanced locally after
/// each accepted commit without asking the repository again, so commits must
/// stay strictly sequential.
pub struct PurgeOrchestrator {
    repository: DomainRepository,
}

impl PurgeOrchestrator {
    pub fn new(transport: RpcTransportBox) -> Self {
        Self {
            repository: DomainRepository::new(transport),
        }
    }

    /// Runs at most `attempts` passes.
    ///
    /// # Errors
    ///
    /// A failed or unparsable checkout aborts immediately, as does an attempt
    /// in which every commit was rejected ([`OpsError::NoProgress`]).
    pub async fn purge(&self, attempts: u32) -> Result<PurgeReport> {
        let mut state = PurgeState::default();
        let mut history = Vec::new();

        while state.attempts_used < attempts {
            state.attempts_used += 1;
            let attempt = state.attempts_used;
            info!(attempt, "purge attempt started, checking out domain config");

            let snapshot = self.repository.checkout(VersionSelector::head()).await?;
            info!(
                attempt,
                version = snapshot.version,
                objects = snapshot.len(),
                "domain config received"
            );

            if snapshot.is_empty() {
                info!("no objects in domain config, nothing to do");
                return Ok(Self::report(PurgeOutcome::Completed, attempts, &state, history));
            }

            state.expected_version = snapshot.version;
            let mut stats = AttemptStats {
                attempt,
                version: snapshot.version,
                objects: snapshot.len(),
                removed: 0,
                failed: 0,
            };

            for object in &snapshot.objects {
                let commit = Commit::remove(object);
                match self.repository.commit(state.expected_version, &commit).await? {
                    CallOutcome::Completed(_) => {
                        state.expected_version += 1;
                        state.removed += 1;
                        stats.removed += 1;
                        info!(object = %object.kind, reference = %object.reference, "remove succeeded");
                    }
                    CallOutcome::Failed => {
                        stats.failed += 1;
                        warn!(object = %object.kind, reference = %object.reference, "remove failed");
                    }
                }
            }
            history.push(stats);

            if stats.failed == 0 {
                return Ok(Self::report(PurgeOutcome::Completed, attempts, &state, history));
            }
            if stats.removed == 0 {
                return Err(OpsError::NoProgress {
                    attempt,
                    failed: stats.failed,
                });
            }
            info!(
                attempt,
                removed = stats.removed,
                failed = stats.failed,
                "attempt finished with failures"
            );
        }

        warn!(
            attempts,
            removed = state.removed,
            "attempts exhausted before the domain config was emptied"
        );
        Ok(Self::report(PurgeOutcome::Exhausted, attempts, &state, history))
    }

    fn report(
        outcome: PurgeOutcome,
        budget: u32,
        state: &PurgeState,
        attempts: Vec<AttemptStats>,
    ) -> PurgeReport {
        PurgeReport {
            outcome,
            removed: state.removed,
            budget,
            attempts,
            expected_version: state.expected_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryRepository;
    use serde_json::{Value, json};

    fn terminal(id: u64) -> Value {
        json!({"terminal": {"ref": {"id": id}, "data": {"name": format!("t{id}")}}})
    }

    fn repository(version: u64, count: u64) -> InMemoryRepository {
        InMemoryRepository::new(version, (1..=count).map(terminal).collect())
    }

    #[tokio::test]
    async fn test_empty_store_issues_no_commits() {
        let repo = repository(5, 0);
        let orchestrator = PurgeOrchestrator::new(Box::new(repo.clone()));

        let report = orchestrator.purge(3).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.removed, 0);
        assert!(report.attempts.is_empty());
        assert_eq!(repo.checkouts(), 1);
        assert_eq!(repo.commits(), 0);
    }

    #[tokio::test]
    async fn test_all_commits_accepted() {
        let repo = repository(10, 3);
        let orchestrator = PurgeOrchestrator::new(Box::new(repo.clone()));

        let report = orchestrator.purge(5).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.removed, 3);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.expected_version, 13);
        assert_eq!(repo.committed_versions(), vec![10, 11, 12]);
        assert_eq!(repo.checkouts(), 1);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_version_only_advances_on_success() {
        let repo = repository(10, 3);
        repo.reject(json!({"id": 2}), 1);
        let orchestrator = PurgeOrchestrator::new(Box::new(repo.clone()));

        let report = orchestrator.purge(2).await.unwrap();

        assert!(report.is_complete());
        // Object 3 is committed against 11, not 12: the rejected commit did not bump it.
        assert_eq!(repo.committed_versions(), vec![10, 11, 12]);
        assert_eq!(report.attempts[0].failed, 1);
        assert_eq!(report.attempts[1].version, 12);
    }

    #[tokio::test]
    async fn test_checkout_failure_is_fatal() {
        let repo = repository(1, 2);
        repo.fail_checkout();
        let orchestrator = PurgeOrchestrator::new(Box::new(repo.clone()));

        let err = orchestrator.purge(3).await.unwrap_err();

        assert!(matches!(err, OpsError::CallFailed { .. }));
        assert_eq!(repo.checkouts(), 1);
        assert_eq!(repo.commits(), 0);
    }

    #[tokio::test]
    async fn test_single_failing_object_is_no_progress() {
        let repo = repository(1, 1);
        repo.reject(json!({"id": 1}), 1);
        let orchestrator = PurgeOrchestrator::new(Box::new(repo.clone()));

        let err = orchestrator.purge(10).await.unwrap_err();

        assert!(matches!(err, OpsError::NoProgress { attempt: 1, failed: 1 }));
        assert_eq!(repo.checkouts(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_is_exhausted_without_calls() {
        let repo = repository(1, 1);
        let orchestrator = PurgeOrchestrator::new(Box::new(repo.clone()));

        let report = orchestrator.purge(0).await.unwrap();

        assert_eq!(report.outcome, PurgeOutcome::Exhausted);
        assert_eq!(repo.checkouts(), 0);
    }

    #[test]
    fn test_report_summary() {
        let report = PurgeReport {
            outcome: PurgeOutcome::Exhausted,
            removed: 2,
            budget: 2,
            attempts: vec![],
            expected_version: 0,
        };
        assert_eq!(
            report.to_string(),
            "Removed 2 objects\nDomain config purge hasn't been finished completely in 2 attempts"
        );
    }
}
