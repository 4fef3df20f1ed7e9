//! Run-level summary of a differential testing batch.

use crate::error::FsdiffResult;
use crate::result::DivergenceReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A test case abandoned because a system failed while executing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseFailure {
    pub test_case: String,
    pub system: String,
    pub error: String,
}

/// Accumulated outcome of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Systems in execution order
    pub systems: Vec<String>,
    /// Test cases selected for the batch, in execution order
    pub planned: Vec<String>,
    /// Test cases whose results were reduced
    pub executed: Vec<String>,
    /// Reports for test cases where any signal diverged
    pub divergences: Vec<DivergenceReport>,
    /// Test cases skipped under the skip-test-case policy
    pub failures: Vec<TestCaseFailure>,
    /// Output and trace divergences counted across the batch
    pub issues: u64,
}

impl RunSummary {
    pub fn new(systems: Vec<String>, planned: Vec<String>) -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            systems,
            planned,
            executed: Vec::new(),
            divergences: Vec::new(),
            failures: Vec::new(),
            issues: 0,
        }
    }

    /// Fold one reduced test case into the summary.
    pub fn absorb(&mut self, report: DivergenceReport) {
        self.issues += report.issues();
        self.executed.push(report.test_case.clone());
        if report.diverged() {
            self.divergences.push(report);
        }
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Write the summary as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> FsdiffResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "executed {}/{} test case(s) against {} system(s)",
            self.executed.len(),
            self.planned.len(),
            self.systems.len()
        )?;
        for report in &self.divergences {
            let mut signals = Vec::new();
            if report.output.diverged {
                signals.push("output");
            }
            if report.trace.diverged {
                signals.push("trace");
            }
            if report.abstract_state.diverged {
                signals.push("abstract state");
            }
            writeln!(f, "  {}: {}", report.test_case, signals.join(", "))?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  {}: {} failed: {}",
                failure.test_case, failure.system, failure.error
            )?;
        }
        write!(f, "issues: {}", self.issues)
    }
}
