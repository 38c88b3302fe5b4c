use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Outcome, Phase};
use crate::github::WorkflowRef;

/// How the sweep of one workflow went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub workflow: WorkflowRef,
    /// Convergence attempts actually made (1-based count).
    pub attempts: u32,
    /// Runs that returned 204 across all attempts.
    pub deleted: usize,
    pub outcome: Outcome,
    pub phases: Vec<Phase>,
}

impl WorkflowReport {
    pub fn is_converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }
}

/// Record of a whole invocation, printed with `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub workflows: Vec<WorkflowReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl SweepSummary {
    pub fn new(workflows: Vec<WorkflowReport>, started_at: DateTime<Utc>) -> Self {
        let completed_at = Utc::now();
        Self {
            workflows,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        }
    }

    /// True when every processed workflow converged. Vacuously true for none.
    pub fn is_complete(&self) -> bool {
        self.workflows.iter().all(WorkflowReport::is_converged)
    }

    pub fn deleted(&self) -> usize {
        self.workflows.iter().map(|w| w.deleted).sum()
    }

    pub fn exhausted(&self) -> impl Iterator<Item = &WorkflowReport> {
        self.workflows.iter().filter(|w| !w.is_converged())
    }
}
