//! Command-line interface of runsweep, built on clap.
//!
//! Target flags may be left out when the matching `GITHUB_*` environment
//! variable is set; see [`Target::resolve`](crate::config::Target::resolve).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Bulk-delete GitHub Actions run history of disabled workflows.
#[derive(Debug, Parser)]
#[command(name = "runsweep", version, about)]
pub struct Cli {
    /// Sweep one named workflow, or every disabled workflow of the repository.
    #[arg(long, alias = "deleteLevel", value_enum)]
    pub delete_level: Option<DeleteLevel>,

    /// Personal access token with `actions:write` on the repository.
    #[arg(long)]
    pub token: Option<String>,

    /// Repository owner, e.g. `owner` in github.com/owner/repo.
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name, e.g. `repo` in github.com/owner/repo.
    #[arg(long)]
    pub repo: Option<String>,

    /// Workflow name as shown in the Actions tab (substring match). Required
    /// with `--delete-level workflow`.
    #[arg(long, alias = "workflowName")]
    pub workflow_name: Option<String>,

    /// Path to a TOML config file. Defaults to `runsweep.toml` if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Runs requested per listing page (1-100).
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Maximum concurrent requests during listing and deletion.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Convergence attempts after the first before giving up.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Seconds to wait between convergence attempts.
    #[arg(long)]
    pub backoff_secs: Option<u64>,

    /// Exit with status 1 when runs remain after the last attempt.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Print a JSON report of the sweep when done.
    #[arg(long, default_value_t = false)]
    pub report: bool,

    /// Enable debug logging on stderr.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeleteLevel {
    /// A single workflow selected by name.
    Workflow,
    /// Every disabled workflow in the repository.
    Repo,
}
