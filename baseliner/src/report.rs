//! Run summaries.
//!
//! An [`OptimizeReport`] collects the outcome of every `(test, suffix)` pass
//! in one invocation, along with the passes that failed, and renders them as
//! text or JSON.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::OptimizerError;
use crate::optimizer::{BaselineSuffix, OptimizeOutcome};

/// A pass that aborted with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassFailure {
    pub test: String,
    pub suffix: BaselineSuffix,
    pub error: String,
}

/// Overall result of a run, used to pick the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing to change.
    Clean,
    /// Changes were applied.
    Changed,
    /// Check mode found changes that have not been applied.
    PendingChanges,
    /// At least one pass failed.
    Failed,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Clean | RunStatus::Changed => 0,
            RunStatus::PendingChanges => 1,
            RunStatus::Failed => 2,
        }
    }
}

/// Aggregated outcomes of one invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizeReport {
    check: bool,
    outcomes: Vec<OptimizeOutcome>,
    failures: Vec<PassFailure>,
}

/// Counts rendered in the summary line and the JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub passes: usize,
    pub changed: usize,
    pub promoted: usize,
    pub removed: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    check: bool,
    totals: ReportTotals,
    outcomes: &'a [OptimizeOutcome],
    failures: &'a [PassFailure],
}

impl OptimizeReport {
    pub fn new(check: bool) -> Self {
        Self {
            check,
            ..Default::default()
        }
    }

    pub fn is_check(&self) -> bool {
        self.check
    }

    pub fn record(&mut self, outcome: OptimizeOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn record_failure(&mut self, test: &str, suffix: BaselineSuffix, error: &OptimizerError) {
        self.failures.push(PassFailure {
            test: test.to_string(),
            suffix,
            error: error.to_string(),
        });
    }

    pub fn outcomes(&self) -> &[OptimizeOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> &[PassFailure] {
        &self.failures
    }

    pub fn totals(&self) -> ReportTotals {
        ReportTotals {
            passes: self.outcomes.len() + self.failures.len(),
            changed: self.outcomes.iter().filter(|o| !o.is_clean()).count(),
            promoted: self.outcomes.iter().map(OptimizeOutcome::promotions).sum(),
            removed: self.outcomes.iter().map(OptimizeOutcome::removals).sum(),
            failed: self.failures.len(),
        }
    }

    pub fn status(&self) -> RunStatus {
        let totals = self.totals();
        if totals.failed > 0 {
            RunStatus::Failed
        } else if totals.changed == 0 {
            RunStatus::Clean
        } else if self.check {
            RunStatus::PendingChanges
        } else {
            RunStatus::Changed
        }
    }

    /// Human-readable report: one block per pass with changes, then failures,
    /// then a summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for outcome in self.outcomes.iter().filter(|o| !o.is_clean()) {
            let _ = writeln!(out, "{} ({}):", outcome.test, outcome.suffix);
            for change in &outcome.changes {
                let _ = writeln!(out, "  {}", change.describe(outcome.check));
            }
        }

        for failure in &self.failures {
            let _ = writeln!(
                out,
                "{} ({}): error: {}",
                failure.test, failure.suffix, failure.error
            );
        }

        let totals = self.totals();
        let verb = if self.check { "would be" } else { "were" };
        if totals.changed == 0 && totals.failed == 0 {
            let _ = writeln!(out, "All {} baseline sets are already optimal.", totals.passes);
        } else {
            let _ = writeln!(
                out,
                "{} of {} baseline sets changed: {} baselines {} promoted, {} {} removed.",
                totals.changed, totals.passes, totals.promoted, verb, totals.removed, verb
            );
        }
        if totals.failed > 0 {
            let _ = writeln!(out, "{} passes failed.", totals.failed);
        }
        out
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport {
            check: self.check,
            totals: self.totals(),
            outcomes: &self.outcomes,
            failures: &self.failures,
        })
    }
}
