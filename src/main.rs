mod cli;
mod config;
mod error;
#[cfg(test)]
mod fake;
mod github;
mod sweep;
mod ui;
mod workflows;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{SweepConfig, Target};
use github::GithubClient;
use sweep::{SweepSummary, Sweeper};
use ui::TerminalProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("{} {err:#}", Style::new().red().bold().apply_to("error:"));
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let target = Target::resolve(&cli, |name| std::env::var(name).ok())?;
    let mut config = SweepConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&cli);
    config.validate()?;

    let client = GithubClient::with_base_url(
        target.token.clone(),
        &target.owner,
        &target.repo,
        &config.api_url,
        &config.api_version,
    )
    .context("failed to build HTTP client")?;

    let progress = TerminalProgress::new();
    let summary = Sweeper::new(&client, config.settings(), &progress)
        .run(&target.scope)
        .await
        .with_context(|| format!("failed to list workflows of {}/{}", target.owner, target.repo))?;

    info!(
        deleted = summary.deleted(),
        duration_ms = summary.duration_ms,
        complete = summary.is_complete(),
        "sweep finished"
    );
    if cli.report {
        println!("{}", render_report(&summary)?);
    }
    Ok(exit_status(&summary, config.fail_on_exhausted))
}

fn render_report(summary: &SweepSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize sweep report")
}

/// 0 when everything converged, or when leftovers are tolerated.
fn exit_status(summary: &SweepSummary, fail_on_exhausted: bool) -> u8 {
    if fail_on_exhausted && !summary.is_complete() {
        1
    } else {
        0
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
