//! Integration tests for the `nbsync` CLI binary.
//!
//! These exercise argument parsing, offline validation and configuration
//! error paths without a live NetBox instance.
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command with env isolation: no `NBSYNC_*`/`NETBOX_*` variables
/// and config directories pointed at a nonexistent path.
fn nbsync_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nbsync");
    cmd.env("HOME", "/tmp/nbsync-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nbsync-cli-test-nonexistent")
        .env_remove("NBSYNC_PROFILE")
        .env_remove("NBSYNC_OUTPUT")
        .env_remove("NBSYNC_INSECURE")
        .env_remove("NBSYNC_TIMEOUT")
        .env_remove("NBSYNC_DATA_DIR")
        .env_remove("NETBOX_URL")
        .env_remove("NETBOX_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn sample_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "definitions/sites/dc1.yaml", "- name: DC1\n  slug: dc1\n");
    write(
        dir.path(),
        "inventory/hardware/active/servers.yaml",
        r"
- name: srv01
  site_slug: dc1
  device_type_slug: r650
  role_slug: server
  interfaces:
    - name: eth0
      link: { peer_device: pp01, peer_port: '1' }
",
    );
    dir
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nbsync_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "Expected 'Usage' in output:\n{stderr}");
}

#[test]
fn test_help_lists_commands() {
    nbsync_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("sync")
            .and(predicate::str::contains("validate"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    nbsync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nbsync"));
}

#[test]
fn test_completions_bash() {
    nbsync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Validate ────────────────────────────────────────────────────────

#[test]
fn test_validate_counts_objects_and_links() {
    let tree = sample_tree();
    nbsync_cmd()
        .args(["validate", "--data-dir"])
        .arg(tree.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 objects valid (1 devices, 1 links)"));
}

#[test]
fn test_validate_json_output() {
    let tree = sample_tree();
    nbsync_cmd()
        .args(["-o", "json", "validate", "--data-dir"])
        .arg(tree.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"devices\": 1").and(predicate::str::contains("\"sites\": 1")));
}

#[test]
fn test_validate_reports_problems_as_usage_error() {
    let tree = sample_tree();
    write(
        tree.path(),
        "inventory/hardware/passive/dup.yaml",
        "- { name: srv01, site_slug: dc1, device_type_slug: r650, role_slug: server }\n",
    );
    nbsync_cmd()
        .args(["validate", "--data-dir"])
        .arg(tree.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("declared more than once"));
}

#[test]
fn test_validate_malformed_yaml_names_file() {
    let tree = sample_tree();
    write(tree.path(), "definitions/racks/bad.yaml", "- name: [oops\n");
    nbsync_cmd()
        .args(["validate", "--data-dir"])
        .arg(tree.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bad.yaml"));
}

// ── Sync configuration errors ───────────────────────────────────────

#[test]
fn test_sync_without_url_is_usage_error() {
    let tree = sample_tree();
    nbsync_cmd()
        .args(["sync", "--data-dir"])
        .arg(tree.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No NetBox URL"));
}

#[test]
fn test_sync_with_unknown_profile() {
    let tree = sample_tree();
    nbsync_cmd()
        .args(["--profile", "nope", "sync", "--data-dir"])
        .arg(tree.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Profile 'nope' not found"));
}

#[test]
fn test_sync_unreachable_host_is_connection_error() {
    let tree = sample_tree();
    nbsync_cmd()
        .args(["--url", "http://127.0.0.1:9", "--token", "abc", "--timeout", "5"])
        .args(["sync", "--dry-run", "--data-dir"])
        .arg(tree.path())
        .assert()
        .code(7);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_points_at_toml() {
    nbsync_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
