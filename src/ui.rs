//! Terminal output for a sweep: progress lines on stdout and a spinner while
//! run pages are being fetched.
//!
//! The sweep reports through the [`Progress`] trait; [`TerminalProgress`]
//! renders it with `console` styles and an `indicatif` spinner.

use std::sync::Mutex;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::github::{ApiError, WorkflowRef};
use crate::sweep::{DeletionOutcome, Outcome, SweepSummary};

pub const NO_WORKFLOWS: &str = "No workflows found with the given name, please confirm the workflow exists and has been disabled";
pub const ALL_DELETED: &str = "All runs deleted successfully";

/// Receives the user-visible events of a sweep.
pub trait Progress {
    /// A workflow is about to be processed.
    fn workflow(&self, workflow: &WorkflowRef);
    fn enumerating(&self, attempt: u32, max_attempts: u32);
    fn pending(&self, count: usize, skipped_pages: &[u32]);
    fn enumeration_failed(&self, error: &ApiError);
    /// One line per deletion attempt.
    fn deletion(&self, outcome: &DeletionOutcome);
    fn retrying(&self, attempt: u32, max_attempts: u32, backoff: Duration);
    fn no_workflows(&self);
    fn finished(&self, summary: &SweepSummary);
}

pub fn workflow_line(workflow: &WorkflowRef) -> String {
    format!("{workflow:?}")
}

pub fn pending_line(count: usize) -> String {
    format!("Runs pending deletion: {count}")
}

pub fn deletion_line(outcome: &DeletionOutcome) -> String {
    match outcome.status {
        Some(status) if outcome.is_deleted() => {
            format!("Run ID: {} Deletion Status Code: {status}", outcome.run_id)
        }
        Some(status) => format!(
            "Failed to delete run with ID: {} (status {status})",
            outcome.run_id
        ),
        None => format!(
            "Failed to delete run with ID: {} (no response)",
            outcome.run_id
        ),
    }
}

pub fn retry_line(attempt: u32, max_attempts: u32, backoff: Duration) -> String {
    format!(
        "Retrying to delete failed runs in {}s (attempt {attempt}/{max_attempts})",
        backoff.as_secs()
    )
}

/// Final status lines: one success line, or one line per exhausted workflow.
pub fn summary_lines(summary: &SweepSummary) -> Vec<String> {
    if summary.is_complete() {
        return vec![ALL_DELETED.to_string()];
    }
    summary
        .exhausted()
        .map(|report| {
            let remaining = match report.outcome {
                Outcome::Exhausted { remaining: Some(n) } => format!("{n} runs"),
                _ => "an unknown number of runs".to_string(),
            };
            format!(
                "{remaining} of workflow {:?} could not be deleted after {} attempts",
                report.workflow.name, report.attempts
            )
        })
        .collect()
}

/// Progress renderer for an interactive terminal.
///
/// Successful deletions are marked in green, failures in red, retries in
/// yellow.
pub struct TerminalProgress {
    // Spinner shown while run pages are fetched.
    spinner: Mutex<Option<ProgressBar>>,
    green: Style,
    red: Style,
    yellow: Style,
    bold: Style,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            bold: Style::new().bold(),
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_and_clear();
        }
    }
}

impl Progress for TerminalProgress {
    fn workflow(&self, workflow: &WorkflowRef) {
        println!("{}", self.bold.apply_to(workflow_line(workflow)));
    }

    fn enumerating(&self, attempt: u32, max_attempts: u32) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Listing runs (attempt {attempt}/{max_attempts})"));
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(pb);
        }
    }

    fn pending(&self, count: usize, skipped_pages: &[u32]) {
        self.stop_spinner();
        println!("{}", pending_line(count));
        if !skipped_pages.is_empty() {
            println!(
                "  {} {} page(s) could not be listed and will be retried: {skipped_pages:?}",
                self.yellow.apply_to("!"),
                skipped_pages.len()
            );
        }
    }

    fn enumeration_failed(&self, error: &ApiError) {
        self.stop_spinner();
        println!("  {} Failed to list runs: {error}", self.red.apply_to("✗"));
    }

    fn deletion(&self, outcome: &DeletionOutcome) {
        let marker = if outcome.is_deleted() {
            self.green.apply_to("✓")
        } else {
            self.red.apply_to("✗")
        };
        println!("  {marker} {}", deletion_line(outcome));
    }

    fn retrying(&self, attempt: u32, max_attempts: u32, backoff: Duration) {
        println!(
            "  {} {}",
            self.yellow.apply_to("↻"),
            retry_line(attempt, max_attempts, backoff)
        );
    }

    fn no_workflows(&self) {
        println!("{}", self.yellow.apply_to(NO_WORKFLOWS));
    }

    fn finished(&self, summary: &SweepSummary) {
        let style = if summary.is_complete() {
            &self.green
        } else {
            &self.red
        };
        for line in summary_lines(summary) {
            println!("{}", style.apply_to(line));
        }
    }
}

/// Captures the plain-text lines a sweep would print.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.lines().iter().filter(|l| l.starts_with(prefix)).count()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

#[cfg(test)]
impl Progress for RecordingProgress {
    fn workflow(&self, workflow: &WorkflowRef) {
        self.push(workflow_line(workflow));
    }

    fn enumerating(&self, _attempt: u32, _max_attempts: u32) {}

    fn pending(&self, count: usize, _skipped_pages: &[u32]) {
        self.push(pending_line(count));
    }

    fn enumeration_failed(&self, error: &ApiError) {
        self.push(format!("Failed to list runs: {error}"));
    }

    fn deletion(&self, outcome: &DeletionOutcome) {
        self.push(deletion_line(outcome));
    }

    fn retrying(&self, attempt: u32, max_attempts: u32, backoff: Duration) {
        self.push(retry_line(attempt, max_attempts, backoff));
    }

    fn no_workflows(&self) {
        self.push(NO_WORKFLOWS.to_string());
    }

    fn finished(&self, summary: &SweepSummary) {
        for line in summary_lines(summary) {
            self.push(line);
        }
    }
}
