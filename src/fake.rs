//! In-memory stand-in for the Actions API, shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::github::types::{RunPage, WorkflowPage};
use crate::github::{ApiError, RunRef, RunsApi, WorkflowRef};

#[derive(Debug, Clone, Copy)]
struct Rejection {
    status: u16,
    /// `None` rejects forever.
    times: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    workflows: Vec<WorkflowRef>,
    /// run id -> workflow id
    runs: BTreeMap<u64, u64>,
    /// page -> remaining failures, `None` fails forever
    failing_pages: HashMap<u32, Option<u32>>,
    page_overlap: usize,
    reverse_page_latency: bool,
    served_pages: Vec<u32>,
    rejections: HashMap<u64, Rejection>,
    unreachable: HashSet<u64>,
    fetch_calls: usize,
    delete_calls: usize,
    workflow_list_calls: usize,
}

/// Runs are listed in ascending id order; deleting a run removes it.
#[derive(Debug, Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_workflow(&self, id: u64, name: &str, state: &str) {
        self.state().workflows.push(WorkflowRef {
            id,
            name: name.into(),
            state: state.into(),
        });
    }

    pub fn add_runs(&self, workflow_id: u64, ids: impl IntoIterator<Item = u64>) {
        let mut state = self.state();
        for id in ids {
            state.runs.insert(id, workflow_id);
        }
    }

    /// Every fetch of `page` fails with a 502.
    pub fn fail_page(&self, page: u32) {
        self.state().failing_pages.insert(page, None);
    }

    /// The next fetch of `page` fails with a 502, later ones succeed.
    pub fn fail_page_once(&self, page: u32) {
        self.state().failing_pages.insert(page, Some(1));
    }

    /// Higher pages answer sooner, so concurrent fetches complete in reverse.
    pub fn reverse_page_latency(&self) {
        self.state().reverse_page_latency = true;
    }

    /// Pages after the first also repeat the last `overlap` runs of the page before.
    pub fn set_page_overlap(&self, overlap: usize) {
        self.state().page_overlap = overlap;
    }

    /// Deleting `run_id` always answers `status` and leaves the run in place.
    pub fn reject_deletion(&self, run_id: u64, status: u16) {
        self.state()
            .rejections
            .insert(run_id, Rejection { status, times: None });
    }

    /// Deleting `run_id` answers `status` once, then succeeds.
    pub fn reject_deletion_once(&self, run_id: u64, status: u16) {
        self.state().rejections.insert(
            run_id,
            Rejection {
                status,
                times: Some(1),
            },
        );
    }

    /// Deleting `run_id` fails with a transport error, before any response.
    pub fn fail_transport_for(&self, run_id: u64) {
        self.state().unreachable.insert(run_id);
    }

    pub fn remaining_runs(&self) -> usize {
        self.state().runs.len()
    }

    pub fn runs_of(&self, workflow_id: u64) -> usize {
        self.state()
            .runs
            .values()
            .filter(|w| **w == workflow_id)
            .count()
    }

    pub fn fetch_calls(&self) -> usize {
        self.state().fetch_calls
    }

    /// Pages in the order their fetches completed.
    pub fn served_pages(&self) -> Vec<u32> {
        self.state().served_pages.clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.state().delete_calls
    }

    pub fn workflow_list_calls(&self) -> usize {
        self.state().workflow_list_calls
    }
}

fn page_window(len: usize, page: u32, per_page: u32, overlap: usize) -> (usize, usize) {
    let start = (page.max(1) as usize - 1) * per_page as usize;
    let from = if page > 1 {
        start.saturating_sub(overlap)
    } else {
        start
    };
    (from.min(len), (start + per_page as usize).min(len))
}

/// A host-less URL fails in the request builder, the one `reqwest::Error`
/// that needs no network.
fn transport_error() -> ApiError {
    ApiError::Transport(reqwest::Client::new().get("http://").build().unwrap_err())
}

impl RunsApi for FakePlatform {
    async fn list_workflows(&self, page: u32, per_page: u32) -> Result<WorkflowPage, ApiError> {
        let mut state = self.state();
        state.workflow_list_calls += 1;
        let (from, to) = page_window(state.workflows.len(), page, per_page, 0);
        Ok(WorkflowPage {
            total_count: state.workflows.len() as u64,
            workflows: state.workflows[from..to].to_vec(),
        })
    }

    async fn fetch_runs(&self, page: u32, per_page: u32) -> Result<RunPage, ApiError> {
        let delayed = {
            let mut state = self.state();
            state.fetch_calls += 1;
            state.reverse_page_latency
        };
        if delayed {
            let wait = 1_000u64.saturating_sub(u64::from(page));
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }

        let mut state = self.state();
        state.served_pages.push(page);
        let failing = match state.failing_pages.get_mut(&page) {
            Some(None) => true,
            Some(Some(left)) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if failing {
            return Err(ApiError::Protocol {
                status: 502,
                message: "Bad Gateway".into(),
            });
        }
        let all: Vec<RunRef> = state
            .runs
            .iter()
            .map(|(&id, &workflow_id)| RunRef { id, workflow_id })
            .collect();
        let (from, to) = page_window(all.len(), page, per_page, state.page_overlap);
        Ok(RunPage {
            total_count: all.len() as u64,
            workflow_runs: all[from..to].to_vec(),
        })
    }

    async fn delete_run(&self, run_id: u64) -> Result<u16, ApiError> {
        let mut state = self.state();
        state.delete_calls += 1;
        if state.unreachable.contains(&run_id) {
            return Err(transport_error());
        }
        if let Some(rejection) = state.rejections.get_mut(&run_id) {
            match rejection.times {
                None => return Ok(rejection.status),
                Some(0) => {}
                Some(ref mut left) => {
                    *left -= 1;
                    return Ok(rejection.status);
                }
            }
        }
        Ok(match state.runs.remove(&run_id) {
            Some(_) => 204,
            None => 404,
        })
    }
}
