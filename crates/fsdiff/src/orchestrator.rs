//! Drives every selected test case through every system under test.
//!
//! Systems run strictly one after another: the trace file is a shared side
//! channel overwritten by each test execution, so concurrent runs would
//! misattribute traces.

use crate::compare::OutputComparison;
use crate::config::{FailurePolicy, HarnessConfig};
use crate::error::{FsdiffError, FsdiffResult};
use crate::evaluator::{AbstractStateEvaluator, ExternalEvaluator};
use crate::ordering::{compare_test_names, select, TestRange};
use crate::process::ProcessRunner;
use crate::registry::{SystemRegistry, TestCaseRegistry};
use crate::report::{RunSummary, TestCaseFailure};
use crate::system::{ExecutionContext, FileSystemUnderTest};
use crate::test_case::TestCase;
use std::path::PathBuf;
use thiserror::Error;

/// A run stopped before finishing its batch. Carries everything accumulated so far.
#[derive(Debug, Error)]
#[error("run aborted at test case '{test_case}' ({system}) after {} issue(s): {source}", .summary.issues)]
pub struct AbortedRun {
    pub test_case: String,
    pub system: String,
    pub summary: Box<RunSummary>,
    #[source]
    pub source: FsdiffError,
}

/// A system failing inside one test case.
struct SystemFailure {
    system: String,
    error: FsdiffError,
    /// Whether the system ended the cycle idle, so it can be reused
    recovered: bool,
}

/// Owns the systems, the test cases, and the order they meet in.
pub struct Orchestrator {
    systems: Vec<FileSystemUnderTest>,
    test_cases: Vec<TestCase>,
    ctx: ExecutionContext,
    comparison: OutputComparison,
    failure_policy: FailurePolicy,
    artifact_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        systems: Vec<FileSystemUnderTest>,
        test_cases: Vec<TestCase>,
        ctx: ExecutionContext,
    ) -> Self {
        let artifact_dir = ctx.runner.cwd().to_path_buf();
        Self {
            systems,
            test_cases,
            ctx,
            comparison: OutputComparison::default(),
            failure_policy: FailurePolicy::default(),
            artifact_dir,
        }
    }

    /// Discover systems, test cases, and the evaluator under `config.root_dir`.
    pub fn from_config(config: &HarnessConfig) -> FsdiffResult<Self> {
        let root = &config.root_dir;
        let systems = SystemRegistry::discover(root)?;
        let test_cases = TestCaseRegistry::discover(root)?;
        tracing::info!(
            count = systems.len(),
            systems = ?systems.names(),
            "found filesystems under test"
        );
        tracing::info!(count = test_cases.len(), "found test cases");

        let mut ctx = ExecutionContext::new(
            ProcessRunner::new(root),
            config.timeouts.clone(),
            config.trace_path(),
        );
        if let Some(evaluator) =
            ExternalEvaluator::from_config(&config.evaluator, root, config.timeouts.evaluator())?
        {
            tracing::info!(
                evaluator = evaluator.name(),
                program = %config.evaluator.program,
                "abstract-state evaluation enabled"
            );
            ctx = ctx.with_evaluator(Box::new(evaluator));
        }

        Ok(Self::new(systems.into_systems(), test_cases.into_test_cases(), ctx)
            .with_comparison(config.comparison)
            .with_failure_policy(config.failure_policy)
            .with_artifact_dir(config.artifact_dir()))
    }

    pub fn with_comparison(mut self, comparison: OutputComparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn system_names(&self) -> Vec<String> {
        self.systems.iter().map(|s| s.name().to_string()).collect()
    }

    /// Names of the test cases `range` selects, in execution order.
    pub fn plan(&self, range: TestRange) -> Vec<String> {
        let names: Vec<String> = self.test_cases.iter().map(|t| t.name().to_string()).collect();
        select(names, range, |name| name.as_str())
    }

    /// Execute the selected batch and return the accumulated summary.
    pub async fn run(&mut self, range: TestRange) -> Result<RunSummary, AbortedRun> {
        let all = std::mem::take(&mut self.test_cases);
        let (mut batch, rest): (Vec<TestCase>, Vec<TestCase>) =
            all.into_iter().partition(|tc| range.includes(tc.name()));
        batch.sort_by(|a, b| compare_test_names(a.name(), b.name()));

        let mut summary = RunSummary::new(
            self.system_names(),
            batch.iter().map(|tc| tc.name().to_string()).collect(),
        );
        let outcome = self.execute_batch(&mut batch, &mut summary).await;

        self.test_cases = batch;
        self.test_cases.extend(rest);
        summary.finish();

        match outcome {
            Ok(()) => {
                tracing::info!(
                    issues = summary.issues,
                    executed = summary.executed.len(),
                    "run complete"
                );
                Ok(summary)
            }
            Err((test_case, failure)) => {
                tracing::error!(
                    test_case = %test_case,
                    system = %failure.system,
                    error = %failure.error,
                    issues = summary.issues,
                    "run aborted"
                );
                Err(AbortedRun {
                    test_case,
                    system: failure.system,
                    summary: Box::new(summary),
                    source: failure.error,
                })
            }
        }
    }

    async fn execute_batch(
        &mut self,
        batch: &mut [TestCase],
        summary: &mut RunSummary,
    ) -> Result<(), (String, SystemFailure)> {
        let total = batch.len();
        for (index, test_case) in batch.iter_mut().enumerate() {
            let name = test_case.name().to_string();
            tracing::info!(test_case = %name, "[{}/{}] running", index + 1, total);
            tracing::debug!(test_case = %name, source = %test_case.source().display(), "test source");

            if let Err(failure) =
                execute_test_case(&mut self.systems, test_case, &self.ctx).await
            {
                test_case.result.clear();
                let isolate =
                    self.failure_policy == FailurePolicy::SkipTestCase && failure.recovered;
                if !isolate {
                    return Err((name, failure));
                }
                tracing::error!(
                    test_case = %name,
                    system = %failure.system,
                    error = %failure.error,
                    "skipping test case"
                );
                summary.failures.push(TestCaseFailure {
                    test_case: name,
                    system: failure.system,
                    error: failure.error.to_string(),
                });
                continue;
            }

            let report = test_case
                .result
                .reduce(&name, self.comparison, &self.artifact_dir)
                .map_err(|error| {
                    (
                        name.clone(),
                        SystemFailure {
                            system: String::new(),
                            error,
                            recovered: true,
                        },
                    )
                })?;
            summary.absorb(report);
            tracing::info!(
                test_case = %name,
                issues = summary.issues,
                "[{}/{}] done",
                index + 1,
                total
            );
        }
        Ok(())
    }
}

/// Set up, run, and tear down every system for one test case.
///
/// A failed run still triggers teardown before the failure is returned.
async fn execute_test_case(
    systems: &mut [FileSystemUnderTest],
    test_case: &mut TestCase,
    ctx: &ExecutionContext,
) -> Result<(), SystemFailure> {
    for system in systems.iter_mut() {
        let name = system.name().to_string();
        let failure = |error: FsdiffError, recovered: bool| SystemFailure {
            system: name.clone(),
            error,
            recovered,
        };

        if let Err(error) = system.setup(ctx).await {
            let recovered = !system.is_active();
            return Err(failure(error, recovered));
        }

        let ran = system.run(test_case, ctx).await;
        let torn_down = system.teardown(ctx).await;

        match (ran, torn_down) {
            (Ok(()), Ok(())) => {}
            (Err(error), Ok(())) => return Err(failure(error, true)),
            (Err(error), Err(teardown_error)) => {
                tracing::error!(
                    system = %name,
                    error = %teardown_error,
                    "teardown after failed run also failed"
                );
                return Err(failure(error, false));
            }
            (Ok(()), Err(error)) => return Err(failure(error, false)),
        }
    }
    Ok(())
}
