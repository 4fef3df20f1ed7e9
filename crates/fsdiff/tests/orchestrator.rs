//! End-to-end runs against scratch run roots populated with shell scripts.

#![cfg(unix)]

use fsdiff::{
    FailurePolicy, FsdiffError, HarnessConfig, Orchestrator, OutputComparison, TestRange,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A run root whose systems log every lifecycle call to `calls.log`.
fn run_root(systems: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for system in systems {
        write_script(
            dir.path(),
            &format!("setup-{system}"),
            &format!("echo \"setup {system}\" >> calls.log\necho /ws/{system}\n"),
        );
        write_script(
            dir.path(),
            &format!("teardown-{system}"),
            &format!("echo \"teardown {system} $1\" >> calls.log\n"),
        );
    }
    dir
}

fn add_test_case(root: &Path, name: &str, body: &str) {
    write_script(
        root,
        &format!("{name}.out"),
        &format!("echo \"run {name} $1\" >> calls.log\n{body}"),
    );
    fs::write(root.join(format!("{name}.c")), "int main() { return 0; }\n").unwrap();
}

fn calls(root: &Path) -> Vec<String> {
    fs::read_to_string(root.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn config(root: &Path) -> HarnessConfig {
    HarnessConfig {
        root_dir: root.to_path_buf(),
        ..Default::default()
    }
}

/// Prints five lines on ext4 and `btrfs_lines` lines on btrfs.
fn line_printer(btrfs_lines: usize) -> String {
    format!(
        "if [ \"$1\" = /ws/btrfs ]; then n={btrfs_lines}; else n=5; fi\n\
         i=0\n\
         while [ $i -lt $n ]; do echo \"line $i\"; i=$((i+1)); done\n"
    )
}

#[tokio::test]
async fn test_each_system_is_set_up_run_and_torn_down_in_order() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "1", "echo ok\n");

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.systems, vec!["btrfs", "ext4"]);
    assert_eq!(
        calls(root.path()),
        vec![
            "setup btrfs",
            "run 1 /ws/btrfs",
            "teardown btrfs /ws/btrfs",
            "setup ext4",
            "run 1 /ws/ext4",
            "teardown ext4 /ws/ext4",
        ]
    );
    assert_eq!(summary.issues, 0);
}

#[tokio::test]
async fn test_range_selects_numeric_names_and_keeps_others() {
    let root = run_root(&["ext4"]);
    for name in ["1", "2", "3", "6", "abc"] {
        add_test_case(root.path(), name, "");
    }

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let range = TestRange::new(Some(2), Some(5));
    assert_eq!(orchestrator.plan(range), vec!["abc", "2", "3"]);

    let summary = orchestrator.run(range).await.unwrap();
    assert_eq!(summary.executed, vec!["abc", "2", "3"]);
    let runs: Vec<String> = calls(root.path())
        .into_iter()
        .filter(|line| line.starts_with("run"))
        .collect();
    assert_eq!(runs, vec!["run abc /ws/ext4", "run 2 /ws/ext4", "run 3 /ws/ext4"]);
}

#[tokio::test]
async fn test_equal_line_counts_record_no_issue() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "3", &line_printer(5));

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.issues, 0);
    assert!(summary.divergences.is_empty());
    assert!(!root.path().join("3.ext4.output").exists());
}

#[tokio::test]
async fn test_line_count_divergence_is_one_issue_with_artifacts() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "3", &line_printer(7));

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.issues, 1);
    let ext4 = fs::read_to_string(root.path().join("3.ext4.output")).unwrap();
    let btrfs = fs::read_to_string(root.path().join("3.btrfs.output")).unwrap();
    assert_eq!(ext4.lines().count(), 5);
    assert_eq!(btrfs.lines().count(), 7);
    assert!(!root.path().join("3.ext4.trace.csv").exists());
}

#[tokio::test]
async fn test_exact_comparison_flags_same_length_outputs() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "8", "echo \"$1\"\n");

    let mut orchestrator = Orchestrator::from_config(&config(root.path()))
        .unwrap()
        .with_comparison(OutputComparison::Exact);
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.issues, 1);
    assert!(root.path().join("8.btrfs.output").exists());
}

#[tokio::test]
async fn test_trace_divergence_writes_trace_artifacts() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(
        root.path(),
        "5",
        "if [ \"$1\" = /ws/btrfs ]; then printf '1: 0 0\\n2: -1 28\\n' > trace.csv; \
         else printf '1: 0 0\\n2: 0 0\\n' > trace.csv; fi\n",
    );

    let artifacts = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::from_config(&config(root.path()))
        .unwrap()
        .with_artifact_dir(artifacts.path());
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.issues, 1);
    let report = &summary.divergences[0];
    assert!(report.trace.diverged);
    assert!(!report.output.diverged);
    assert_eq!(report.trace_divergences[0].mismatch.index, 1);
    assert_eq!(
        fs::read_to_string(artifacts.path().join("5.btrfs.trace.csv")).unwrap(),
        "1: 0 0\n2: -1 28\n"
    );
    assert!(artifacts.path().join("5.ext4.trace.csv").exists());
}

#[tokio::test]
async fn test_non_utf8_trace_does_not_stop_the_batch() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "1", "printf '1: 0 0\\n\\377\\n' > trace.csv\n");
    add_test_case(root.path(), "2", "echo fine\n");

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.executed, vec!["1", "2"]);
    assert_eq!(summary.issues, 0);
    assert!(calls(root.path()).contains(&"run 2 /ws/ext4".to_string()));
}

#[tokio::test]
async fn test_abstract_state_divergence_is_not_an_issue() {
    let root = run_root(&["ext4", "btrfs"]);
    write_script(root.path(), "asfs", "echo \"state of $1\"\n");
    add_test_case(root.path(), "2", "echo same\n");

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.issues, 0);
    assert_eq!(summary.divergences.len(), 1);
    assert!(summary.divergences[0].abstract_state.diverged);
}

#[tokio::test]
async fn test_failed_run_tears_down_and_aborts_batch() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "3", "echo fine\n");
    // Leaving a directory where the trace belongs makes reading it fail.
    add_test_case(
        root.path(),
        "4",
        "if [ \"$1\" = /ws/btrfs ]; then mkdir trace.csv; fi\n",
    );
    add_test_case(root.path(), "5", "echo never\n");

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let aborted = orchestrator.run(TestRange::default()).await.unwrap_err();

    assert_eq!(aborted.test_case, "4");
    assert_eq!(aborted.system, "btrfs");
    assert!(matches!(aborted.source, FsdiffError::Io(_)));
    assert_eq!(aborted.summary.executed, vec!["3"]);

    let log = calls(root.path());
    let run_at = log.iter().position(|l| l == "run 4 /ws/btrfs").unwrap();
    assert_eq!(log[run_at + 1], "teardown btrfs /ws/btrfs");
    assert_eq!(log.len(), run_at + 2);
    assert!(!log.iter().any(|l| l.starts_with("run 5")));
}

#[tokio::test]
async fn test_skip_policy_isolates_failing_test_case() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(
        root.path(),
        "4",
        "if [ \"$1\" = /ws/btrfs ]; then exec sleep 10; fi\n",
    );
    add_test_case(root.path(), "5", "echo fine\n");

    let mut cfg = config(root.path());
    cfg.timeouts.run = 1;
    cfg.failure_policy = FailurePolicy::SkipTestCase;
    let mut orchestrator = Orchestrator::from_config(&cfg).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.executed, vec!["5"]);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].test_case, "4");
    assert_eq!(summary.failures[0].system, "btrfs");
    assert!(calls(root.path()).contains(&"teardown btrfs /ws/btrfs".to_string()));
    assert!(calls(root.path()).contains(&"run 5 /ws/ext4".to_string()));
}

#[tokio::test]
async fn test_setup_failure_is_not_retried() {
    let root = run_root(&["ext4"]);
    write_script(
        root.path(),
        "setup-btrfs",
        "echo \"setup btrfs\" >> calls.log\necho 'no device' >&2\nexit 1\n",
    );
    write_script(root.path(), "teardown-btrfs", "echo \"teardown btrfs\" >> calls.log\n");
    add_test_case(root.path(), "1", "");

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let aborted = orchestrator.run(TestRange::default()).await.unwrap_err();

    assert!(matches!(
        aborted.source,
        FsdiffError::Setup { ref stderr, .. } if stderr.contains("no device")
    ));
    assert_eq!(calls(root.path()), vec!["setup btrfs"]);
}

#[tokio::test]
async fn test_unpaired_setup_fails_discovery_before_running() {
    let root = run_root(&["ext4"]);
    write_script(root.path(), "setup-xfs", "echo \"setup xfs\" >> calls.log\n");
    add_test_case(root.path(), "1", "");

    let result = Orchestrator::from_config(&config(root.path()));
    assert!(matches!(result, Err(FsdiffError::TeardownScriptNotFound(ref name)) if name == "xfs"));
    assert!(calls(root.path()).is_empty());
}

#[tokio::test]
async fn test_observations_do_not_leak_between_test_cases() {
    let root = run_root(&["ext4", "btrfs"]);
    add_test_case(root.path(), "1", &line_printer(7));
    add_test_case(root.path(), "2", &line_printer(5));

    let mut orchestrator = Orchestrator::from_config(&config(root.path())).unwrap();
    let summary = orchestrator.run(TestRange::default()).await.unwrap();

    assert_eq!(summary.issues, 1);
    assert_eq!(summary.divergences.len(), 1);
    assert_eq!(summary.divergences[0].test_case, "1");
}
