//! Test-case executables and their per-cycle observations.

use crate::result::TestCaseResult;
use std::path::{Path, PathBuf};

/// A compiled test program run identically against every system.
#[derive(Debug)]
pub struct TestCase {
    name: String,
    executable: PathBuf,
    source: PathBuf,
    /// Observations for the cycle in progress; drained by each reduction.
    pub result: TestCaseResult,
}

impl TestCase {
    pub fn new(name: impl Into<String>, executable: PathBuf, source: PathBuf) -> Self {
        Self {
            name: name.into(),
            executable,
            source,
            result: TestCaseResult::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}
