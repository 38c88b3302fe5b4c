//! Workflow discovery: which workflow definitions a sweep should process.

use crate::github::{ApiError, RunsApi, WorkflowRef};

/// Which workflows a sweep targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// Every disabled workflow in the repository.
    Repo,
    /// Disabled workflows whose name contains `name`.
    Workflow { name: String },
}

impl DeleteScope {
    pub fn matches(&self, workflow: &WorkflowRef) -> bool {
        if !workflow.is_disabled() {
            return false;
        }
        match self {
            DeleteScope::Repo => true,
            DeleteScope::Workflow { name } => workflow.name.contains(name.as_str()),
        }
    }
}

/// Lists every workflow of the repository, following pagination until
/// `total_count` entries (or an empty page) have been seen.
pub async fn list_workflows(
    api: &impl RunsApi,
    per_page: u32,
) -> Result<Vec<WorkflowRef>, ApiError> {
    let mut workflows = Vec::new();
    let mut page = 1;
    loop {
        let listing = api.list_workflows(page, per_page).await?;
        let received = listing.workflows.len();
        workflows.extend(listing.workflows);
        if received == 0 || workflows.len() as u64 >= listing.total_count {
            break;
        }
        page += 1;
    }
    Ok(workflows)
}

pub fn select_workflows(workflows: Vec<WorkflowRef>, scope: &DeleteScope) -> Vec<WorkflowRef> {
    workflows.into_iter().filter(|w| scope.matches(w)).collect()
}
