//! Configuration for the fsdiff harness

use crate::compare::OutputComparison;
use crate::error::FsdiffResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory scanned for systems and test cases; subprocesses run here
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Where divergence artifacts are written (defaults to `root_dir`)
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,

    /// Trace file produced by each test run, relative to `root_dir`
    #[serde(default = "default_trace_file")]
    pub trace_file: String,

    /// Optional path for the JSON run report
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Abstract-state evaluator configuration
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Subprocess timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Output equivalence strategy
    #[serde(default)]
    pub comparison: OutputComparison,

    /// What to do when a system fails during a test case
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            artifact_dir: None,
            trace_file: default_trace_file(),
            report_path: None,
            evaluator: EvaluatorConfig::default(),
            timeouts: TimeoutConfig::default(),
            comparison: OutputComparison::default(),
            failure_policy: FailurePolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// When the abstract-state evaluator is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluatorMode {
    /// Use the evaluator if its program exists in the root directory
    #[default]
    Auto,
    /// Require the evaluator
    Always,
    /// Never evaluate abstract state
    Never,
}

/// Abstract-state evaluator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub enabled: EvaluatorMode,

    /// Program name, resolved against the root directory
    #[serde(default = "default_evaluator_program")]
    pub program: String,

    /// Flag passed after the workspace path
    #[serde(default = "default_evaluator_flag")]
    pub flag: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            enabled: EvaluatorMode::Auto,
            program: default_evaluator_program(),
            flag: default_evaluator_flag(),
        }
    }
}

/// Subprocess timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_setup_timeout")]
    pub setup: u64,

    #[serde(default = "default_run_timeout")]
    pub run: u64,

    #[serde(default = "default_teardown_timeout")]
    pub teardown: u64,

    #[serde(default = "default_evaluator_timeout")]
    pub evaluator: u64,
}

impl TimeoutConfig {
    pub fn setup(&self) -> Duration {
        Duration::from_secs(self.setup)
    }

    pub fn run(&self) -> Duration {
        Duration::from_secs(self.run)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_secs(self.teardown)
    }

    pub fn evaluator(&self) -> Duration {
        Duration::from_secs(self.evaluator)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            setup: default_setup_timeout(),
            run: default_run_timeout(),
            teardown: default_teardown_timeout(),
            evaluator: default_evaluator_timeout(),
        }
    }
}

/// Reaction to a system failing inside a test case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Tear down the failing system and abort the remaining batch
    #[default]
    Abort,
    /// Tear down the failing system, record the failure, continue with the next test case
    SkipTestCase,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Persistent log file
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            json: false,
        }
    }
}

// Default value helpers
fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_trace_file() -> String {
    "trace.csv".to_string()
}

fn default_evaluator_program() -> String {
    "asfs".to_string()
}

fn default_evaluator_flag() -> String {
    "-lm".to_string()
}

fn default_setup_timeout() -> u64 {
    300
}

fn default_run_timeout() -> u64 {
    600
}

fn default_teardown_timeout() -> u64 {
    300
}

fn default_evaluator_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("fsdiff.log")
}

impl HarnessConfig {
    /// Load configuration from defaults, an optional file, and `FSDIFF_` environment variables
    pub fn load(path: Option<&Path>) -> FsdiffResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&HarnessConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        // e.g. FSDIFF_TIMEOUTS__RUN=30
        builder = builder.add_source(
            config::Environment::with_prefix("FSDIFF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Directory divergence artifacts are written to
    pub fn artifact_dir(&self) -> &Path {
        self.artifact_dir.as_deref().unwrap_or(&self.root_dir)
    }

    /// Absolute location of the per-run trace file
    pub fn trace_path(&self) -> PathBuf {
        self.root_dir.join(&self.trace_file)
    }
}
