//! Abstract-state evaluation of a workspace.

use crate::config::{EvaluatorConfig, EvaluatorMode};
use crate::error::{FsdiffError, FsdiffResult};
use crate::process::ProcessRunner;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Projects a workspace into a comparable abstract state.
#[async_trait]
pub trait AbstractStateEvaluator: Send + Sync {
    /// Evaluate `workspace`. A non-zero exit yields an empty state; spawn
    /// failures and timeouts are errors.
    async fn evaluate(&self, workspace: &str) -> FsdiffResult<String>;

    /// Evaluator name
    fn name(&self) -> &str;
}

/// Evaluator backed by an external program invoked as `<program> <workspace> <flag>`.
pub struct ExternalEvaluator {
    program: PathBuf,
    flag: String,
    runner: ProcessRunner,
    timeout: Duration,
}

impl ExternalEvaluator {
    pub fn new(
        program: impl Into<PathBuf>,
        flag: impl Into<String>,
        runner: ProcessRunner,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
            runner,
            timeout,
        }
    }

    /// Build the evaluator described by `config`, resolving the program against `root`.
    ///
    /// Returns `None` when disabled, or in `auto` mode when the program is absent.
    pub fn from_config(
        config: &EvaluatorConfig,
        root: &Path,
        timeout: Duration,
    ) -> FsdiffResult<Option<Self>> {
        let program = root.join(&config.program);
        match config.enabled {
            EvaluatorMode::Never => Ok(None),
            EvaluatorMode::Auto if !program.is_file() => {
                tracing::debug!(program = %program.display(), "no abstract-state evaluator");
                Ok(None)
            }
            EvaluatorMode::Always if !program.is_file() => Err(FsdiffError::Config(format!(
                "abstract-state evaluator {} not found",
                program.display()
            ))),
            _ => Ok(Some(Self::new(
                program,
                config.flag.clone(),
                ProcessRunner::new(root),
                timeout,
            ))),
        }
    }
}

#[async_trait]
impl AbstractStateEvaluator for ExternalEvaluator {
    async fn evaluate(&self, workspace: &str) -> FsdiffResult<String> {
        let output = self
            .runner
            .run(&self.program, [workspace, self.flag.as_str()], self.timeout)
            .await?;

        if !output.success() {
            tracing::warn!(
                workspace,
                status = %output.status,
                stderr = %output.stderr.trim_end(),
                "abstract-state evaluation failed, recording empty state"
            );
            return Ok(String::new());
        }
        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        "external"
    }
}
