//! Bounded subprocess invocation.

use crate::error::{FsdiffError, FsdiffResult};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}

/// Runs external commands from a fixed working directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cwd: PathBuf,
}

impl ProcessRunner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run `program` with `args`, killing it if it outlives `timeout`.
    ///
    /// A non-zero exit is not an error here; callers inspect the status.
    pub async fn run<I, S>(
        &self,
        program: &Path,
        args: I,
        timeout: Duration,
    ) -> FsdiffResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %program.display(), "spawning");
        let child = cmd.spawn().map_err(|source| FsdiffError::Spawn {
            command: program.to_path_buf(),
            source,
        })?;

        // Dropping the pending future on timeout kills the child.
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| FsdiffError::Timeout {
                command: program.display().to_string(),
                secs: timeout.as_secs(),
            })??;

        Ok(ProcessOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
