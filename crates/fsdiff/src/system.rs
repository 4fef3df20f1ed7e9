//! Filesystems under test and their setup / run / teardown lifecycle.

use crate::config::TimeoutConfig;
use crate::error::{FsdiffError, FsdiffResult};
use crate::evaluator::AbstractStateEvaluator;
use crate::process::ProcessRunner;
use crate::result::Observation;
use crate::test_case::TestCase;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lifecycle state of a system under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemState {
    /// No workspace; ready for setup
    Idle,
    /// Setup succeeded and printed this workspace path
    Active { workspace: String },
}

/// Everything a system needs to invoke external commands.
pub struct ExecutionContext {
    pub runner: ProcessRunner,
    pub timeouts: TimeoutConfig,
    /// Side-channel trace file written by test executables
    pub trace_path: PathBuf,
    pub evaluator: Option<Box<dyn AbstractStateEvaluator>>,
}

impl ExecutionContext {
    pub fn new(runner: ProcessRunner, timeouts: TimeoutConfig, trace_path: PathBuf) -> Self {
        Self {
            runner,
            timeouts,
            trace_path,
            evaluator: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn AbstractStateEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }
}

/// One filesystem implementation, driven through external setup and teardown commands.
#[derive(Debug)]
pub struct FileSystemUnderTest {
    name: String,
    setup_command: PathBuf,
    teardown_command: PathBuf,
    state: SystemState,
}

impl FileSystemUnderTest {
    pub fn new(name: impl Into<String>, setup_command: PathBuf, teardown_command: PathBuf) -> Self {
        Self {
            name: name.into(),
            setup_command,
            teardown_command,
            state: SystemState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn setup_command(&self) -> &Path {
        &self.setup_command
    }

    pub fn teardown_command(&self) -> &Path {
        &self.teardown_command
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn workspace(&self) -> Option<&str> {
        match &self.state {
            SystemState::Active { workspace } => Some(workspace),
            SystemState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SystemState::Active { .. })
    }

    /// Run the setup command and adopt the workspace it prints, minus one trailing newline.
    pub async fn setup(&mut self, ctx: &ExecutionContext) -> FsdiffResult<&str> {
        if self.is_active() {
            return Err(FsdiffError::AlreadySetup(self.name.clone()));
        }

        let no_args: [&str; 0] = [];
        let output = match ctx
            .runner
            .run(&self.setup_command, no_args, ctx.timeouts.setup())
            .await
        {
            Ok(output) => output,
            Err(FsdiffError::Spawn { source, .. }) => {
                return Err(FsdiffError::Setup {
                    system: self.name.clone(),
                    stderr: source.to_string(),
                })
            }
            Err(err) => return Err(err),
        };

        if !output.success() {
            return Err(FsdiffError::Setup {
                system: self.name.clone(),
                stderr: output.stderr,
            });
        }

        let workspace = output.stdout.strip_suffix('\n').unwrap_or(&output.stdout);
        if workspace.is_empty() {
            tracing::warn!(system = %self.name, "setup printed an empty workspace path");
        }

        tracing::debug!(system = %self.name, workspace, "set up");
        self.state = SystemState::Active {
            workspace: workspace.to_string(),
        };
        Ok(self.workspace().unwrap_or_default())
    }

    /// Run `test_case` against the active workspace and record what it produced.
    pub async fn run(&self, test_case: &mut TestCase, ctx: &ExecutionContext) -> FsdiffResult<()> {
        let workspace = self
            .workspace()
            .ok_or_else(|| FsdiffError::WasNotSetup(self.name.clone()))?;

        // A run that writes no trace must not inherit the previous system's.
        remove_if_exists(&ctx.trace_path).await?;

        let output = ctx
            .runner
            .run(test_case.executable(), [workspace], ctx.timeouts.run())
            .await?;
        if !output.success() {
            tracing::debug!(
                system = %self.name,
                test_case = test_case.name(),
                status = %output.status,
                "test executable exited unsuccessfully"
            );
        }

        let trace = match tokio::fs::read(&ctx.trace_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    system = %self.name,
                    test_case = test_case.name(),
                    trace = %ctx.trace_path.display(),
                    "no trace produced, recording empty trace"
                );
                String::new()
            }
            Err(err) => return Err(err.into()),
        };

        let abstract_state = match &ctx.evaluator {
            Some(evaluator) => Some(evaluator.evaluate(workspace).await?),
            None => None,
        };

        test_case.result.record(
            &self.name,
            Observation {
                output: output.combined(),
                trace,
                abstract_state,
            },
        );
        Ok(())
    }

    /// Run the teardown command against the workspace and return to idle.
    ///
    /// On failure the workspace is kept, so the system still reports as active.
    pub async fn teardown(&mut self, ctx: &ExecutionContext) -> FsdiffResult<()> {
        let workspace = self
            .workspace()
            .ok_or_else(|| FsdiffError::WasNotSetup(self.name.clone()))?;

        let output = match ctx
            .runner
            .run(&self.teardown_command, [workspace], ctx.timeouts.teardown())
            .await
        {
            Ok(output) => output,
            Err(FsdiffError::Spawn { source, .. }) => {
                return Err(FsdiffError::Teardown {
                    system: self.name.clone(),
                    stderr: source.to_string(),
                })
            }
            Err(err) => return Err(err),
        };

        if !output.success() {
            return Err(FsdiffError::Teardown {
                system: self.name.clone(),
                stderr: output.stderr,
            });
        }

        tracing::debug!(system = %self.name, "torn down");
        self.state = SystemState::Idle;
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> FsdiffResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
