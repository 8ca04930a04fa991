//! End-to-end CLI tests for the harvester binary.
//!
//! No test here reaches the network: they exercise argument handling and
//! the fail-fast configuration path, which must exit before any state is
//! touched.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn harvester() -> Command {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    // Strip any ambient credentials so the configuration path is deterministic.
    cmd.env_clear();
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    harvester()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Search and download images"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    harvester()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("harvester"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    harvester()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that mutually exclusive filter toggles are rejected.
#[test]
fn test_binary_conflicting_filter_flags_rejected() {
    harvester()
        .args(["--no-filters", "--date-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

/// Missing credentials fail fast with a non-zero exit and touch no state.
#[test]
fn test_binary_without_credentials_fails_before_any_state() {
    let dir = TempDir::new().unwrap();
    harvester()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials"));
    assert!(
        !dir.path().join("progress.json").exists(),
        "configuration failure must not create a checkpoint"
    );
}

/// A missing queries file fails fast even when credentials are present.
#[test]
fn test_binary_missing_queries_file_fails_before_any_state() {
    let dir = TempDir::new().unwrap();
    harvester()
        .current_dir(dir.path())
        .env("API_KEY", "test-key")
        .env("CX", "test-cx")
        .args(["--queries", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("queries"));
    assert!(!dir.path().join("progress.json").exists());
}

/// An empty queries file (comments only) is rejected.
#[test]
fn test_binary_empty_queries_file_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("queries.txt"), "# nothing here\n").unwrap();
    harvester()
        .current_dir(dir.path())
        .env("API_KEY", "test-key")
        .env("CX", "test-cx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no queries"));
}
