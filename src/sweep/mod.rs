//! The discovery-and-deletion pipeline.
//!
//! [`Sweeper`] drives each selected workflow through a [`Convergence`] state
//! machine: enumerate its runs, delete them concurrently, and on any failure
//! wait out the backoff and start over with a fresh enumeration.

mod delete;
mod enumerate;
mod report;
mod state;

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub use delete::{DeletionOutcome, delete_run, delete_runs};
pub use enumerate::enumerate_runs;
pub use report::{SweepSummary, WorkflowReport};
pub use state::{Convergence, Observation, Outcome, Phase, Transition};

use crate::github::{ApiError, RunRef, RunsApi, WorkflowRef};
use crate::ui::Progress;
use crate::workflows::{DeleteScope, list_workflows, select_workflows};

/// Tunables of one sweep, resolved once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSettings {
    /// Page size for run and workflow listings (platform maximum is 100).
    pub per_page: u32,
    /// Maximum requests in flight during a page or deletion fan-out.
    pub concurrency: usize,
    /// Attempts after the first before giving up on a workflow.
    pub max_retries: u32,
    /// Pause between convergence attempts.
    pub backoff: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            per_page: 100,
            concurrency: 32,
            max_retries: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

pub struct Sweeper<'a, A, P> {
    api: &'a A,
    settings: SweepSettings,
    progress: &'a P,
}

impl<'a, A: RunsApi, P: Progress> Sweeper<'a, A, P> {
    pub fn new(api: &'a A, settings: SweepSettings, progress: &'a P) -> Self {
        Self {
            api,
            settings,
            progress,
        }
    }

    /// Sweeps every workflow selected by `scope`, one after another.
    ///
    /// Fails only if the workflow listing itself fails; per-workflow problems
    /// end up in the returned summary.
    pub async fn run(&self, scope: &DeleteScope) -> Result<SweepSummary, ApiError> {
        let started_at = Utc::now();
        let workflows = list_workflows(self.api, self.settings.per_page).await?;
        let targets = select_workflows(workflows, scope);
        if targets.is_empty() {
            self.progress.no_workflows();
            return Ok(SweepSummary::new(Vec::new(), started_at));
        }

        let mut reports = Vec::with_capacity(targets.len());
        for workflow in targets {
            self.progress.workflow(&workflow);
            reports.push(self.sweep_workflow(workflow).await);
        }

        let summary = SweepSummary::new(reports, started_at);
        self.progress.finished(&summary);
        Ok(summary)
    }

    /// Runs the convergence loop for a single workflow.
    pub async fn sweep_workflow(&self, workflow: WorkflowRef) -> WorkflowReport {
        let mut machine = Convergence::new(self.settings.max_retries);
        let mut pending: Vec<RunRef> = Vec::new();
        let mut deleted = 0;

        while machine.phase() != Phase::Done {
            let observation = match machine.phase() {
                Phase::Start => {
                    self.progress
                        .enumerating(machine.attempt(), machine.max_attempts());
                    match enumerate_runs(self.api, workflow.id, &self.settings).await {
                        Ok(enumeration) => {
                            self.progress
                                .pending(enumeration.runs.len(), &enumeration.skipped_pages);
                            pending = enumeration.runs;
                            Observation::Enumerated {
                                runs: pending.len(),
                                skipped: enumeration.skipped_pages.len(),
                            }
                        }
                        Err(err) => {
                            warn!(workflow = %workflow.name, error = %err, "run enumeration failed");
                            self.progress.enumeration_failed(&err);
                            pending.clear();
                            Observation::EnumerationFailed
                        }
                    }
                }
                Phase::Enumerated => {
                    let failed =
                        delete_runs(self.api, &pending, self.settings.concurrency, self.progress)
                            .await;
                    deleted += pending.len() - failed.len();
                    Observation::Deleted {
                        failed: failed.len(),
                    }
                }
                Phase::Done => break,
            };

            match machine.next(observation) {
                Transition::Next(phase) => debug!(workflow = %workflow.name, %phase, "advanced"),
                Transition::Retry { attempt, remaining } => {
                    info!(
                        workflow = %workflow.name,
                        attempt,
                        ?remaining,
                        backoff_secs = self.settings.backoff.as_secs(),
                        "scheduling retry"
                    );
                    self.progress
                        .retrying(attempt, machine.max_attempts(), self.settings.backoff);
                    sleep(self.settings.backoff).await;
                }
                Transition::Complete(outcome) => {
                    debug!(workflow = %workflow.name, ?outcome, "workflow finished");
                }
            }
        }

        WorkflowReport {
            attempts: machine.attempt(),
            deleted,
            outcome: machine.outcome().unwrap_or(Outcome::Converged),
            phases: machine.phases(),
            workflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakePlatform;
    use crate::ui::{ALL_DELETED, NO_WORKFLOWS, RecordingProgress};
    use tokio::time::Instant;

    fn settings() -> SweepSettings {
        SweepSettings {
            per_page: 10,
            concurrency: 4,
            ..SweepSettings::default()
        }
    }

    fn platform_with_workflow(id: u64, runs: std::ops::RangeInclusive<u64>) -> FakePlatform {
        let platform = FakePlatform::new();
        platform.add_workflow(id, "CI", "disabled_manually");
        platform.add_runs(id, runs);
        platform
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_stops_after_four_attempts() {
        let platform = platform_with_workflow(1, 1..=5);
        platform.reject_deletion(2, 500);
        let progress = RecordingProgress::default();
        let sweeper = Sweeper::new(&platform, settings(), &progress);

        let started = Instant::now();
        let summary = sweeper.run(&DeleteScope::Repo).await.unwrap();
        let elapsed = started.elapsed();

        let report = &summary.workflows[0];
        assert_eq!(report.attempts, 4);
        assert_eq!(report.outcome, Outcome::Exhausted { remaining: Some(1) });
        assert_eq!(report.deleted, 4);
        assert_eq!(progress.count("Runs pending deletion"), 4);
        assert_eq!(progress.count("Retrying"), 3);
        assert!(elapsed >= Duration::from_secs(180));
        assert!(elapsed < Duration::from_secs(181));
        assert!(!summary.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn converging_on_second_attempt_stops_immediately() {
        let platform = platform_with_workflow(1, 1..=5);
        platform.reject_deletion_once(3, 502);
        let progress = RecordingProgress::default();
        let sweeper = Sweeper::new(&platform, settings(), &progress);

        let started = Instant::now();
        let report = sweeper
            .sweep_workflow(WorkflowRef {
                id: 1,
                name: "CI".into(),
                state: "disabled_manually".into(),
            })
            .await;
        let elapsed = started.elapsed();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.outcome, Outcome::Converged);
        assert_eq!(report.deleted, 5);
        assert_eq!(progress.count("Retrying"), 1);
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(61));
        // Attempt 2 re-enumerated and only retried the survivor.
        assert_eq!(platform.delete_calls(), 6);
        assert_eq!(platform.remaining_runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn enumeration_failure_retries_after_backoff() {
        let platform = platform_with_workflow(1, 1..=5);
        platform.fail_page(1);
        let progress = RecordingProgress::default();
        let custom = SweepSettings {
            max_retries: 1,
            backoff: Duration::from_secs(5),
            ..settings()
        };
        let sweeper = Sweeper::new(&platform, custom, &progress);

        let started = Instant::now();
        let summary = sweeper.run(&DeleteScope::Repo).await.unwrap();

        assert_eq!(
            summary.workflows[0].outcome,
            Outcome::Exhausted { remaining: None }
        );
        assert_eq!(summary.workflows[0].attempts, 2);
        assert_eq!(progress.count("Failed to list runs"), 2);
        assert_eq!(platform.delete_calls(), 0);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    fn platform_with_hidden_page() -> FakePlatform {
        // Page 1 holds only the active workflow's runs; the target's runs are
        // all on page 2.
        let platform = FakePlatform::new();
        platform.add_workflow(1, "Old CI", "disabled_manually");
        platform.add_workflow(2, "CI", "active");
        platform.add_runs(2, 1..=10);
        platform.add_runs(1, 11..=20);
        platform
    }

    #[tokio::test(start_paused = true)]
    async fn unlisted_page_is_never_reported_as_success() {
        let platform = platform_with_hidden_page();
        platform.fail_page(2);
        let progress = RecordingProgress::default();

        let summary = Sweeper::new(&platform, settings(), &progress)
            .run(&DeleteScope::Repo)
            .await
            .unwrap();

        let report = &summary.workflows[0];
        assert_eq!(report.attempts, 4);
        assert_eq!(report.outcome, Outcome::Exhausted { remaining: None });
        assert!(!summary.is_complete());
        assert_eq!(progress.count("Retrying"), 3);
        assert_eq!(platform.runs_of(1), 10);
        assert_ne!(progress.lines().last().map(String::as_str), Some(ALL_DELETED));
    }

    #[tokio::test(start_paused = true)]
    async fn unlisted_page_is_picked_up_by_the_next_attempt() {
        let platform = platform_with_hidden_page();
        platform.fail_page_once(2);
        let progress = RecordingProgress::default();

        let summary = Sweeper::new(&platform, settings(), &progress)
            .run(&DeleteScope::Repo)
            .await
            .unwrap();

        let report = &summary.workflows[0];
        assert_eq!(report.attempts, 2);
        assert_eq!(report.outcome, Outcome::Converged);
        assert_eq!(report.deleted, 10);
        assert_eq!(platform.runs_of(1), 0);
        assert_eq!(platform.runs_of(2), 10);
        assert_eq!(progress.lines().last().map(String::as_str), Some(ALL_DELETED));
    }

    #[tokio::test]
    async fn full_success_prints_final_message() {
        let platform = platform_with_workflow(1, 1..=25);
        let progress = RecordingProgress::default();
        let sweeper = Sweeper::new(&platform, settings(), &progress);

        let summary = sweeper.run(&DeleteScope::Repo).await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.deleted(), 25);
        let lines = progress.lines();
        assert!(lines[0].starts_with("WorkflowRef { id: 1"));
        assert_eq!(lines[1], "Runs pending deletion: 25");
        assert_eq!(progress.count("Run ID:"), 25);
        assert_eq!(lines.last().map(String::as_str), Some(ALL_DELETED));
    }

    #[tokio::test]
    async fn second_run_finds_nothing_to_delete() {
        let platform = platform_with_workflow(1, 1..=12);

        let first = RecordingProgress::default();
        Sweeper::new(&platform, settings(), &first)
            .run(&DeleteScope::Repo)
            .await
            .unwrap();
        let deletes_after_first = platform.delete_calls();

        let second = RecordingProgress::default();
        let summary = Sweeper::new(&platform, settings(), &second)
            .run(&DeleteScope::Repo)
            .await
            .unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.workflows[0].deleted, 0);
        assert_eq!(summary.workflows[0].attempts, 1);
        assert_eq!(second.count("Runs pending deletion: 0"), 1);
        assert_eq!(platform.delete_calls(), deletes_after_first);
    }

    #[tokio::test]
    async fn no_matching_workflows_makes_no_deletions() {
        let platform = FakePlatform::new();
        platform.add_workflow(1, "CI", "active");
        platform.add_runs(1, 1..=5);
        let progress = RecordingProgress::default();

        let summary = Sweeper::new(&platform, settings(), &progress)
            .run(&DeleteScope::Workflow { name: "CI".into() })
            .await
            .unwrap();

        assert!(summary.workflows.is_empty());
        assert_eq!(progress.lines(), vec![NO_WORKFLOWS.to_string()]);
        assert_eq!(platform.delete_calls(), 0);
        assert_eq!(platform.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn other_workflows_runs_are_untouched() {
        let platform = FakePlatform::new();
        platform.add_workflow(1, "Old CI", "disabled_manually");
        platform.add_workflow(2, "CI", "active");
        platform.add_runs(1, 1..=15);
        platform.add_runs(2, 16..=30);
        let progress = RecordingProgress::default();

        let summary = Sweeper::new(&platform, settings(), &progress)
            .run(&DeleteScope::Repo)
            .await
            .unwrap();

        assert_eq!(summary.deleted(), 15);
        assert_eq!(platform.runs_of(1), 0);
        assert_eq!(platform.runs_of(2), 15);
    }

    #[tokio::test]
    async fn workflows_are_processed_in_listing_order() {
        let platform = FakePlatform::new();
        platform.add_workflow(5, "Nightly", "disabled_inactivity");
        platform.add_workflow(3, "Docs", "disabled_manually");
        platform.add_runs(5, 1..=3);
        platform.add_runs(3, 4..=6);
        let progress = RecordingProgress::default();

        let summary = Sweeper::new(&platform, settings(), &progress)
            .run(&DeleteScope::Repo)
            .await
            .unwrap();

        let order: Vec<u64> = summary.workflows.iter().map(|w| w.workflow.id).collect();
        assert_eq!(order, vec![5, 3]);
        assert_eq!(platform.remaining_runs(), 0);
    }
}
