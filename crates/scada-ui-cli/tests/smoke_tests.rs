//! Smoke tests for the scada-probe CLI
//!
//! Runs use the simulated engine, so no browser is needed.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the scada-probe binary
fn scada_probe() -> Command {
    let mut cmd = Command::cargo_bin("scada-probe").expect("scada-probe binary should exist");
    cmd.env_remove("SCADA_PROBE_CONFIG")
        .env_remove("SCADA_PROBE_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    scada_probe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    scada_probe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SCADA"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_no_args_fails() {
    scada_probe().assert().failure();
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_all() {
    scada_probe()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("successful_login"))
        .stdout(predicate::str::contains("rejected_login_keeps_login_visible"));
}

#[test]
fn test_list_by_tag_as_json() {
    scada_probe()
        .args(["list", "--tag", "api", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("network_response_and_api_interception"))
        .stdout(predicate::str::contains("successful_login").not());
}

#[test]
fn test_invalid_tag_fails() {
    scada_probe()
        .args(["run", "--tag", "nightly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nightly"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_prints_defaults() {
    scada_probe()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("engine: simulated"))
        .stdout(predicate::str::contains("timeout_ms: 5000"));
}

#[test]
fn test_config_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.yaml");
    fs::write(&path, "timeout_ms: 8000\nfail_fast: true\n").unwrap();

    scada_probe()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_ms: 8000"))
        .stdout(predicate::str::contains("fail_fast: true"));
}

#[test]
fn test_config_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.yaml");
    fs::write(&path, "timeout_ms: 0\n").unwrap();

    scada_probe()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_ms"));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_smoke_writes_report() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("reports").join("smoke.json");

    scada_probe()
        .args(["--color", "never", "run", "--tag", "smoke", "--report"])
        .arg(&report)
        .assert()
        .success()
        .stderr(predicate::str::contains("PASSED"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["engine"], "simulated");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["status"] == "passed"));
}

#[test]
fn test_run_by_name() {
    scada_probe()
        .args(["-q", "run", "--name", "rejected_login"])
        .assert()
        .success();
}

#[test]
fn test_run_unmatched_name_fails() {
    scada_probe()
        .args(["run", "--name", "no_such_scenario"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no built-in scenario"));
}

#[test]
fn test_run_missing_fixture_fails() {
    scada_probe()
        .args(["run", "--tag", "smoke", "--html", "/nonexistent/scada_ui.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTML fixture not found"));
}
