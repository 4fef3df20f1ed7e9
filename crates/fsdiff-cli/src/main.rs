//! fsdiff - differential testing of filesystem implementations
//!
//! Discovers the systems under test and the compiled test cases in a run
//! root, runs every selected test case against every system, and reports
//! where their behavior disagrees.

use clap::Parser;
use fsdiff::{FailurePolicy, HarnessConfig, Orchestrator, OutputComparison, RunSummary, TestRange};
use std::path::PathBuf;

mod error;

use error::{CliError, CliResult};

/// fsdiff CLI
#[derive(Parser, Debug)]
#[command(name = "fsdiff")]
#[command(about = "Differential testing of filesystem implementations", long_about = None)]
#[command(version)]
struct Cli {
    /// First numbered test case to run (inclusive)
    #[arg(long)]
    from: Option<u64>,

    /// Last numbered test case to run (inclusive)
    #[arg(long)]
    to: Option<u64>,

    /// Configuration file path
    #[arg(short, long, env = "FSDIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Run root holding setup/teardown scripts and test executables
    #[arg(short = 'C', long)]
    dir: Option<PathBuf>,

    /// Output comparison: line-count, exact, or normalized
    #[arg(long)]
    comparison: Option<String>,

    /// Reaction to a failing system: abort or skip-test-case
    #[arg(long)]
    on_failure: Option<String>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    /// Print the systems and the ordered test cases without running them
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn range(&self) -> TestRange {
        TestRange::new(self.from, self.to)
    }

    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut HarnessConfig) -> CliResult<()> {
        if let Some(dir) = &self.dir {
            config.root_dir = dir.clone();
        }
        if let Some(comparison) = &self.comparison {
            config.comparison = parse_comparison(comparison)?;
        }
        if let Some(policy) = &self.on_failure {
            config.failure_policy = parse_failure_policy(policy)?;
        }
        if let Some(report) = &self.report {
            config.report_path = Some(report.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = file.clone();
        }
        if self.json {
            config.logging.json = true;
        }
        Ok(())
    }
}

fn parse_comparison(value: &str) -> CliResult<OutputComparison> {
    match value.to_lowercase().as_str() {
        "line-count" | "lines" => Ok(OutputComparison::LineCount),
        "exact" => Ok(OutputComparison::Exact),
        "normalized" => Ok(OutputComparison::Normalized),
        other => Err(CliError::InvalidInput(format!(
            "Unknown comparison: {}",
            other
        ))),
    }
}

fn parse_failure_policy(value: &str) -> CliResult<FailurePolicy> {
    match value.to_lowercase().as_str() {
        "abort" => Ok(FailurePolicy::Abort),
        "skip-test-case" | "skip" => Ok(FailurePolicy::SkipTestCase),
        other => Err(CliError::InvalidInput(format!(
            "Unknown failure policy: {}",
            other
        ))),
    }
}

fn write_report(config: &HarnessConfig, summary: &RunSummary) {
    if let Some(path) = &config.report_path {
        match summary.write_json(path) {
            Ok(()) => tracing::info!(path = %path.display(), "run report written"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to write run report"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = HarnessConfig::load(cli.config.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;
    cli.apply(&mut config)?;

    // Held for the whole run; dropping it flushes the log file
    let _logging = fsdiff::logging::init(&config.logging)?;

    tracing::info!(
        root = %config.root_dir.display(),
        comparison = ?config.comparison,
        failure_policy = ?config.failure_policy,
        "starting fsdiff"
    );

    let mut orchestrator = Orchestrator::from_config(&config)?;
    let range = cli.range();

    if cli.list {
        println!("systems:");
        for name in orchestrator.system_names() {
            println!("  {}", name);
        }
        println!("test cases:");
        for name in orchestrator.plan(range) {
            println!("  {}", name);
        }
        return Ok(());
    }

    match orchestrator.run(range).await {
        Ok(summary) => {
            println!("{}", summary);
            write_report(&config, &summary);
            tracing::info!("Found {} issue(s)", summary.issues);
            Ok(())
        }
        Err(aborted) => {
            println!("{}", aborted.summary);
            write_report(&config, &aborted.summary);
            Err(aborted.into())
        }
    }
}
