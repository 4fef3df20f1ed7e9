//! fsdiff - differential testing of filesystem implementations
//!
//! Runs the same compiled test programs against several filesystems under
//! test and flags test cases where their observable behavior disagrees.
//!
//! # Run root layout
//!
//! | Artifact | Meaning |
//! |----------|---------|
//! | `setup-<fs>` / `teardown-<fs>` | Lifecycle scripts of one system under test |
//! | `<name>.out` / `<name>.c` | Test executable and its source |
//! | `asfs` | Optional abstract-state evaluator |
//! | `trace.csv` | Trace written by each test run |
//!
//! Setup prints a workspace path on stdout; the test executable and the
//! teardown script receive it as their only argument.
//!
//! # Quick Start
//!
//! ```no_run
//! use fsdiff::{HarnessConfig, Orchestrator, TestRange};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::load(None)?;
//! let mut orchestrator = Orchestrator::from_config(&config)?;
//! let summary = orchestrator.run(TestRange::new(Some(1), Some(100))).await?;
//! println!("{} issue(s)", summary.issues);
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod orchestrator;
pub mod ordering;
pub mod process;
pub mod registry;
pub mod report;
pub mod result;
pub mod system;
pub mod test_case;
pub mod trace;

#[cfg(all(test, unix))]
pub(crate) mod testing;

// Re-export key types at crate root.
pub use compare::{EquivalenceGroup, OutputComparison, SignalVerdict};
pub use config::{EvaluatorMode, FailurePolicy, HarnessConfig, LoggingConfig, TimeoutConfig};
pub use error::{FsdiffError, FsdiffResult};
pub use evaluator::{AbstractStateEvaluator, ExternalEvaluator};
pub use orchestrator::{AbortedRun, Orchestrator};
pub use ordering::{compare_test_names, TestRange};
pub use process::{ProcessOutput, ProcessRunner};
pub use registry::{SystemRegistry, TestCaseRegistry};
pub use report::{RunSummary, TestCaseFailure};
pub use result::{DivergenceReport, Observation, Tally, TestCaseResult};
pub use system::{ExecutionContext, FileSystemUnderTest, SystemState};
pub use test_case::TestCase;
