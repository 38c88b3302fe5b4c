use std::fmt;

use serde::{Deserialize, Serialize};

/// Phases of the per-workflow convergence loop.
///
/// Each attempt flows through: START → ENUMERATED → (DONE | back to START)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Start,
    Enumerated,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => write!(f, "START"),
            Phase::Enumerated => write!(f, "ENUMERATED"),
            Phase::Done => write!(f, "DONE"),
        }
    }
}

/// What the driver observed while executing the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Enumeration finished with `runs` pending deletion; `skipped` pages
    /// could not be listed, so more runs may exist.
    Enumerated { runs: usize, skipped: usize },
    /// Enumeration could not even learn the page count.
    EnumerationFailed,
    /// The deletion fan-out finished; this many runs still need deleting.
    Deleted { failed: usize },
}

/// How a workflow's sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing left to delete.
    Converged,
    /// Retry ceiling reached with runs still present. `None` when the last
    /// attempt failed before the runs could be counted.
    Exhausted { remaining: Option<usize> },
}

/// The result of feeding an observation into the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Next(Phase),
    /// Back to `Start` after the backoff; `attempt` is the upcoming attempt.
    Retry { attempt: u32, remaining: Option<usize> },
    Complete(Outcome),
}

/// Convergence state for one workflow.
#[derive(Debug, Clone)]
pub struct Convergence {
    phase: Phase,
    attempt: u32,
    max_retries: u32,
    history: Vec<Phase>,
    outcome: Option<Outcome>,
    /// The current attempt's listing missed pages.
    incomplete: bool,
}

impl Convergence {
    pub fn new(max_retries: u32) -> Self {
        Self {
            phase: Phase::Start,
            attempt: 1,
            max_retries,
            history: Vec::new(),
            outcome: None,
            incomplete: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 1-based number of the attempt in progress (or the last one, once done).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total attempts allowed: the first plus `max_retries`.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Set once the machine reaches `Done`.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Every phase passed through so far, including the current one.
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases = self.history.clone();
        phases.push(self.phase);
        phases
    }

    /// Compute and apply the transition for `observation` in the current phase.
    ///
    /// - `Start`: zero runs completes as converged; otherwise advances to
    ///   `Enumerated`. An enumeration failure counts as a failed attempt.
    /// - `Enumerated`: zero failures completes as converged; otherwise the
    ///   attempt failed.
    /// - An attempt whose listing skipped pages never converges: it fails
    ///   once its found runs are handled, with the remaining count unknown.
    /// - A failed attempt retries from `Start` while `attempt <= max_retries`,
    ///   and completes as exhausted after that.
    /// - `Done` is terminal and keeps returning its outcome.
    pub fn next(&mut self, observation: Observation) -> Transition {
        if self.phase == Phase::Done {
            return Transition::Complete(self.outcome.unwrap_or(Outcome::Converged));
        }

        let transition = match (self.phase, observation) {
            (Phase::Start, Observation::Enumerated { runs, skipped }) => {
                self.incomplete = skipped > 0;
                match (runs, self.incomplete) {
                    (0, false) => Transition::Complete(Outcome::Converged),
                    (0, true) => self.failed_attempt(None),
                    _ => Transition::Next(Phase::Enumerated),
                }
            }
            (Phase::Start, Observation::EnumerationFailed) => self.failed_attempt(None),
            (Phase::Enumerated, Observation::Deleted { failed: 0 }) if self.incomplete => {
                self.failed_attempt(None)
            }
            (Phase::Enumerated, Observation::Deleted { failed: 0 }) => {
                Transition::Complete(Outcome::Converged)
            }
            (Phase::Enumerated, Observation::Deleted { failed }) => {
                self.failed_attempt((!self.incomplete).then_some(failed))
            }
            // Observation that does not belong to this phase: stay put.
            (phase, _) => Transition::Next(phase),
        };

        self.history.push(self.phase);
        match &transition {
            Transition::Next(next) => self.phase = *next,
            Transition::Retry { attempt, .. } => {
                self.attempt = *attempt;
                self.phase = Phase::Start;
            }
            Transition::Complete(outcome) => {
                self.phase = Phase::Done;
                self.outcome = Some(*outcome);
            }
        }
        transition
    }

    fn failed_attempt(&self, remaining: Option<usize>) -> Transition {
        if self.attempt <= self.max_retries {
            Transition::Retry {
                attempt: self.attempt + 1,
                remaining,
            }
        } else {
            Transition::Complete(Outcome::Exhausted { remaining })
        }
    }
}
