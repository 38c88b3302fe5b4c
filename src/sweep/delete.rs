use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::github::{RunRef, RunsApi};
use crate::ui::Progress;

/// Status the platform returns for a successful run deletion.
pub const DELETED: u16 = 204;

/// What happened to one deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub run_id: u64,
    /// `None` when the request failed before any response arrived.
    pub status: Option<u16>,
}

impl DeletionOutcome {
    pub fn is_deleted(&self) -> bool {
        self.status == Some(DELETED)
    }
}

/// Issues exactly one deletion for `run_id`. Failures come back as values.
pub async fn delete_run(api: &impl RunsApi, run_id: u64) -> DeletionOutcome {
    let status = match api.delete_run(run_id).await {
        Ok(status) => Some(status),
        Err(err) => {
            debug!(run_id, error = %err, "delete request failed");
            None
        }
    };
    DeletionOutcome { run_id, status }
}

/// Deletes every run in `runs`, at most `concurrency` at a time, and returns
/// the outcomes that were not a 204.
///
/// Each outcome is reported to `progress` as it completes.
pub async fn delete_runs(
    api: &impl RunsApi,
    runs: &[RunRef],
    concurrency: usize,
    progress: &impl Progress,
) -> Vec<DeletionOutcome> {
    let mut deletions = stream::iter(runs)
        .map(|run| delete_run(api, run.id))
        .buffer_unordered(concurrency.max(1));

    let mut failed = Vec::new();
    while let Some(outcome) = deletions.next().await {
        progress.deletion(&outcome);
        if !outcome.is_deleted() {
            failed.push(outcome);
        }
    }
    failed
}
