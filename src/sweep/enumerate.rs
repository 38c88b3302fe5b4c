use std::collections::BTreeMap;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, warn};

use super::SweepSettings;
use crate::github::{ApiError, RunRef, RunsApi};

/// Result of one enumeration pass over the repository's run listing.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Runs of the target workflow, unique by id, ascending.
    pub runs: Vec<RunRef>,
    /// Pages whose fetch failed and whose runs are therefore missing.
    pub skipped_pages: Vec<u32>,
}

/// Over-estimates by at most one page; the platform answers an
/// out-of-range page with an empty list.
pub fn page_count(total_count: u64, per_page: u32) -> u32 {
    let pages = total_count / u64::from(per_page.max(1)) + 1;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Collects every run belonging to `workflow_id`.
///
/// Page 1 is fetched first to learn `total_count`; an error there is returned
/// because the page count is unknowable without it. All pages are then fetched
/// with at most `settings.concurrency` requests in flight. A page that fails is
/// left out and listed in [`Enumeration::skipped_pages`]; the next convergence
/// attempt re-enumerates from scratch and picks those runs up.
pub async fn enumerate_runs(
    api: &impl RunsApi,
    workflow_id: u64,
    settings: &SweepSettings,
) -> Result<Enumeration, ApiError> {
    let per_page = settings.per_page;
    let probe = api.fetch_runs(1, per_page).await?;
    let total_pages = page_count(probe.total_count, per_page);
    debug!(workflow_id, total_count = probe.total_count, total_pages, "enumerating runs");

    let mut fetches = stream::iter(1..=total_pages)
        .map(|page| async move { (page, api.fetch_runs(page, per_page).await) })
        .buffer_unordered(settings.concurrency.max(1));

    // Single consumer: the stream yields pages as they complete.
    let mut merged: BTreeMap<u64, RunRef> = BTreeMap::new();
    let mut skipped_pages = Vec::new();
    while let Some((page, result)) = fetches.next().await {
        match result {
            Ok(run_page) => {
                for run in run_page.workflow_runs {
                    if run.workflow_id == workflow_id {
                        merged.insert(run.id, run);
                    }
                }
            }
            Err(err) => {
                warn!(page, error = %err, "skipping run page");
                skipped_pages.push(page);
            }
        }
    }
    skipped_pages.sort_unstable();

    Ok(Enumeration {
        runs: merged.into_values().collect(),
        skipped_pages,
    })
}
