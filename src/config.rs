//! runsweep configuration, resolved once at start-up.
//!
//! [`SweepConfig`] holds the tunables read from `runsweep.toml` (every field
//! has a default) with CLI flags layered on top. [`Target`] is the validated
//! credential and repository coordinates; `GITHUB_*` environment variables
//! take precedence over the matching flags.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

use crate::cli::{Cli, DeleteLevel};
use crate::error::SweepError;
use crate::sweep::SweepSettings;
use crate::workflows::DeleteScope;

const DEFAULT_CONFIG_FILE: &str = "runsweep.toml";

/// Tunables loaded from `runsweep.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// REST API root; point at a GitHub Enterprise host if needed.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Exit non-zero when a workflow still has runs after the last attempt.
    #[serde(default)]
    pub fail_on_exhausted: bool,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_api_version() -> String {
    "2022-11-28".to_string()
}

// GitHub caps `per_page` at 100.
fn default_per_page() -> u32 {
    100
}

fn default_concurrency() -> usize {
    32
}

const MAX_RETRIES_LIMIT: u32 = 1_000;

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    60
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_version: default_api_version(),
            per_page: default_per_page(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
            fail_on_exhausted: false,
        }
    }
}

impl SweepConfig {
    /// Loads `path`, or `runsweep.toml` in the current directory when no path
    /// is given. Only an explicitly requested file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, SweepError> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Layers CLI flags over file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(per_page) = cli.per_page {
            self.per_page = per_page;
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(max_retries) = cli.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(backoff_secs) = cli.backoff_secs {
            self.backoff_secs = backoff_secs;
        }
        if cli.strict {
            self.fail_on_exhausted = true;
        }
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if !(1..=100).contains(&self.per_page) {
            return Err(SweepError::Config(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        if self.concurrency == 0 {
            return Err(SweepError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(SweepError::Config(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }
        if self.api_url.trim().is_empty() {
            return Err(SweepError::Config("api_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn settings(&self) -> SweepSettings {
        SweepSettings {
            per_page: self.per_page,
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            backoff: Duration::from_secs(self.backoff_secs),
        }
    }
}

/// Who to authenticate as and which workflows to sweep.
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub scope: DeleteScope,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Target {
    /// Merges CLI flags with environment overrides, trims everything and
    /// checks that the inputs required by the delete level are present.
    ///
    /// `env` is `std::env::var(..).ok()` in production; empty values count as
    /// unset.
    pub fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self, SweepError> {
        let pick = |var: &str, flag: Option<&str>| -> String {
            env(var)
                .filter(|v| !v.is_empty())
                .or_else(|| flag.map(str::to_string))
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        let level_flag = cli
            .delete_level
            .and_then(|level| level.to_possible_value())
            .map(|value| value.get_name().to_string());
        let level = pick("GITHUB_DELETE_LEVEL", level_flag.as_deref());
        let level = DeleteLevel::from_str(&level, false)
            .map_err(|_| SweepError::InvalidDeleteLevel(level.clone()))?;

        let token = pick("GITHUB_TOKEN", cli.token.as_deref());
        let owner = pick("GITHUB_OWNER", cli.owner.as_deref());
        let repo = pick("GITHUB_REPO", cli.repo.as_deref());
        let workflow_name = pick("GITHUB_WORKFLOW_NAME", cli.workflow_name.as_deref());

        let mut missing = Vec::new();
        for (name, value) in [("token", &token), ("owner", &owner), ("repo", &repo)] {
            if value.is_empty() {
                missing.push(name);
            }
        }
        if level == DeleteLevel::Workflow && workflow_name.is_empty() {
            missing.push("workflowName");
        }
        if !missing.is_empty() {
            return Err(SweepError::MissingInputs(missing.join(", ")));
        }

        let scope = match level {
            DeleteLevel::Repo => DeleteScope::Repo,
            DeleteLevel::Workflow => DeleteScope::Workflow {
                name: workflow_name,
            },
        };
        Ok(Self {
            token,
            owner,
            repo,
            scope,
        })
    }
}
