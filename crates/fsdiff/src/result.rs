//! Per-test-case aggregation of observations and divergence detection.

use crate::compare::{OutputComparison, SignalVerdict};
use crate::error::FsdiffResult;
use crate::trace::{first_mismatch, TraceMismatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What one system produced for one test case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// stdout followed by stderr of the test executable
    pub output: String,
    /// Trace file contents, empty when the run left none
    pub trace: String,
    /// Abstract state, `None` when no evaluator is configured
    pub abstract_state: Option<String>,
}

/// Success/failure counts printed by the test executor as `#SUCCESS n; #FAILURE m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub success: u64,
    pub failure: u64,
}

impl Tally {
    /// Parse the last tally line in `output`.
    pub fn parse(output: &str) -> Option<Self> {
        output.lines().rev().find_map(|line| {
            let (success, failure) = line.trim().split_once(';')?;
            Some(Self {
                success: success.trim().strip_prefix("#SUCCESS")?.trim().parse().ok()?,
                failure: failure.trim().strip_prefix("#FAILURE")?.trim().parse().ok()?,
            })
        })
    }
}

/// First point of disagreement between a system's trace and the reference group's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDivergence {
    /// System whose trace was compared against the reference
    pub system: String,
    /// System providing the reference trace
    pub reference: String,
    pub mismatch: TraceMismatch,
}

/// Verdict for one test case across every system that ran it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub test_case: String,
    pub output: SignalVerdict,
    pub trace: SignalVerdict,
    pub abstract_state: SignalVerdict,
    /// First differing trace record per non-reference trace group
    #[serde(default)]
    pub trace_divergences: Vec<TraceDivergence>,
    /// Executor tallies, for systems whose output carried one
    #[serde(default)]
    pub tallies: BTreeMap<String, Tally>,
    /// Files written because a signal diverged
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
}

impl DivergenceReport {
    /// Issues this test case contributes. Abstract state is informational only.
    pub fn issues(&self) -> u64 {
        u64::from(self.output.diverged) + u64::from(self.trace.diverged)
    }

    pub fn diverged(&self) -> bool {
        self.output.diverged || self.trace.diverged || self.abstract_state.diverged
    }
}

/// Observations for the test case currently being executed, keyed by system name.
#[derive(Debug, Default)]
pub struct TestCaseResult {
    outputs: BTreeMap<String, String>,
    traces: BTreeMap<String, String>,
    abstract_states: BTreeMap<String, String>,
}

impl TestCaseResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, system: &str, observation: Observation) {
        self.outputs.insert(system.to_string(), observation.output);
        self.traces.insert(system.to_string(), observation.trace);
        if let Some(state) = observation.abstract_state {
            self.abstract_states.insert(system.to_string(), state);
        }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.traces.is_empty() && self.abstract_states.is_empty()
    }

    pub fn clear(&mut self) {
        self.outputs.clear();
        self.traces.clear();
        self.abstract_states.clear();
    }

    /// Compare every recorded signal, write artifacts for diverging ones, and
    /// empty the result. The maps are cleared even when writing an artifact fails.
    pub fn reduce(
        &mut self,
        test_case: &str,
        comparison: OutputComparison,
        artifact_dir: &Path,
    ) -> FsdiffResult<DivergenceReport> {
        let outputs = std::mem::take(&mut self.outputs);
        let traces = std::mem::take(&mut self.traces);
        let abstract_states = std::mem::take(&mut self.abstract_states);

        let output = SignalVerdict::from_observations(&outputs, |text| comparison.key(text));
        let trace = SignalVerdict::from_observations(&traces, |text| text.to_string());
        let abstract_state =
            SignalVerdict::from_observations(&abstract_states, |text| text.to_string());

        let tallies = outputs
            .iter()
            .filter_map(|(system, text)| Tally::parse(text).map(|t| (system.clone(), t)))
            .collect();

        let mut artifacts = Vec::new();

        if output.diverged {
            tracing::warn!(
                test_case,
                groups = ?output.partition(),
                "output divergence"
            );
            for (system, text) in &outputs {
                artifacts.push(write_artifact(
                    artifact_dir,
                    &format!("{test_case}.{system}.output"),
                    text,
                )?);
            }
        }

        let mut trace_divergences = Vec::new();
        if trace.diverged {
            tracing::warn!(
                test_case,
                groups = ?trace.partition(),
                "trace divergence"
            );
            trace_divergences = locate_trace_divergences(&trace, &traces);
            for divergence in &trace_divergences {
                tracing::info!(
                    test_case,
                    system = %divergence.system,
                    reference = %divergence.reference,
                    "first trace difference at {}",
                    divergence.mismatch
                );
            }
            for (system, text) in &traces {
                artifacts.push(write_artifact(
                    artifact_dir,
                    &format!("{test_case}.{system}.trace.csv"),
                    text,
                )?);
            }
        }

        if abstract_state.diverged {
            tracing::warn!(
                test_case,
                groups = ?abstract_state.partition(),
                "abstract state divergence"
            );
        }

        Ok(DivergenceReport {
            test_case: test_case.to_string(),
            output,
            trace,
            abstract_state,
            trace_divergences,
            tallies,
            artifacts,
        })
    }
}

fn locate_trace_divergences(
    verdict: &SignalVerdict,
    traces: &BTreeMap<String, String>,
) -> Vec<TraceDivergence> {
    let mut heads = verdict.groups.iter().filter_map(|g| g.systems.first());
    let Some(reference) = heads.next() else {
        return Vec::new();
    };
    let expected = traces.get(reference).map(String::as_str).unwrap_or_default();

    heads
        .filter_map(|system| {
            let actual = traces.get(system).map(String::as_str).unwrap_or_default();
            first_mismatch(expected, actual).map(|mismatch| TraceDivergence {
                system: system.clone(),
                reference: reference.clone(),
                mismatch,
            })
        })
        .collect()
}

fn write_artifact(dir: &Path, file_name: &str, contents: &str) -> FsdiffResult<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, contents)?;
    Ok(path)
}
