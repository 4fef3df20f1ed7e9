//! CLI error types

use fsdiff::{AbortedRun, FsdiffError};
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Discovery, setup, or I/O failure inside the harness
    #[error(transparent)]
    Fsdiff(#[from] FsdiffError),

    /// The batch stopped early
    #[error(transparent)]
    Aborted(#[from] AbortedRun),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
