//! Error types for the fsdiff harness.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering, driving, or comparing systems under test.
#[derive(Debug, Error)]
pub enum FsdiffError {
    /// A `setup-<name>` script has no `teardown-<name>` counterpart.
    #[error("teardown script for filesystem '{0}' not found")]
    TeardownScriptNotFound(String),

    /// A `<name>.out` executable has no `<name>.c` source next to it.
    #[error("source for test case '{0}' not found")]
    TestCaseSourceNotFound(String),

    /// `setup` was called on a system that already holds a workspace.
    #[error("filesystem '{0}' is already set up")]
    AlreadySetup(String),

    /// `run` or `teardown` was called on a system without a workspace.
    #[error("filesystem '{0}' was not set up")]
    WasNotSetup(String),

    /// The setup command failed or could not be started.
    #[error("setup of filesystem '{system}' failed: {stderr}")]
    Setup { system: String, stderr: String },

    /// The teardown command failed or could not be started.
    #[error("teardown of filesystem '{system}' failed: {stderr}")]
    Teardown { system: String, stderr: String },

    /// A subprocess did not finish within its allotted time.
    #[error("command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// A subprocess could not be spawned.
    #[error("failed to start '{}': {source}", command.display())]
    Spawn {
        command: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for FsdiffError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Convenience result type for harness operations.
pub type FsdiffResult<T> = Result<T, FsdiffError>;
