//! Wire types for the GitHub Actions `workflows` and `runs` endpoints.
//!
//! Only the fields the sweep needs are modelled; serde ignores the rest of
//! each payload.

use serde::{Deserialize, Serialize};

/// A workflow definition as listed by `GET /repos/{owner}/{repo}/actions/workflows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub id: u64,
    pub name: String,
    /// e.g. `active`, `disabled_manually`, `disabled_inactivity`.
    pub state: String,
}

impl WorkflowRef {
    /// Any of the platform's `disabled_*` states.
    pub fn is_disabled(&self) -> bool {
        self.state.contains("disabled")
    }
}

/// One historical execution of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunRef {
    pub id: u64,
    pub workflow_id: u64,
}

/// One page of `GET /repos/{owner}/{repo}/actions/runs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPage {
    /// Number of runs in the whole repository, not in this page.
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<RunRef>,
}

/// One page of `GET /repos/{owner}/{repo}/actions/workflows`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowPage {
    pub total_count: u64,
    #[serde(default)]
    pub workflows: Vec<WorkflowRef>,
}
