//! Integration tests for the Skyform CLI
//!
//! These tests run the actual CLI binary and verify output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the binary to test
fn skyform_cmd() -> Command {
    let mut cmd = Command::cargo_bin("skyform").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("RUST_LOG", "warn")
        .env_remove("SKYFORM_SSH_PUBLIC_KEY")
        .env("SKYFORM_POLL_INTERVAL_MS", "10");
    cmd
}

/// Stack file plus index.html in a temp dir
fn stack_dir(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("stack.yaml"), config).unwrap();
    fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
    dir
}

const STACK: &str = r#"
config:
  skyform:sshPublicKey: ssh-rsa AAAAB3NzaC1yc2E test@example
engine:
  status_timeout_ms: 5000
"#;

#[test]
fn test_help_lists_commands() {
    skyform_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("up"));
}

#[test]
fn test_up_help_shows_flags() {
    skyform_cmd()
        .args(["up", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--events"))
        .stdout(predicate::str::contains("--teardown"));
}

// ============================================================================
// preview
// ============================================================================

#[test]
fn test_preview_prints_entries_in_dependency_order() {
    let dir = stack_dir(STACK);
    let output = skyform_cmd()
        .current_dir(dir.path())
        .args(["preview", "--config", "stack.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nginx-aks"))
        .stdout(predicate::str::contains("binding:inflation_provider"))
        .stdout(predicate::str::contains("export frontend_IP"))
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let rg = stdout.find("resource_group").unwrap();
    let cluster = stdout.find("managed_cluster").unwrap();
    let service = stdout.find("nginx-lb").unwrap();
    assert!(rg < cluster && cluster < service);
}

#[test]
fn test_preview_without_ssh_key_fails() {
    let dir = stack_dir("config: {}\n");
    skyform_cmd()
        .current_dir(dir.path())
        .args(["preview", "--config", "stack.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("[SKY-001]"))
        .stderr(predicate::str::contains("sshPublicKey"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_ssh_key_from_environment() {
    let dir = stack_dir("");
    skyform_cmd()
        .current_dir(dir.path())
        .env("SKYFORM_SSH_PUBLIC_KEY", "ssh-ed25519 AAAAC3NzaTEST")
        .args(["preview", "--config", "stack.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("managed_cluster"));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_environment_does_not_abort() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = stack_dir("");
    skyform_cmd()
        .current_dir(dir.path())
        .env("UNRELATED_VAR", OsStr::from_bytes(b"\xff\xfe"))
        .env("SKYFORM_SSH_PUBLIC_KEY", "ssh-ed25519 AAAAC3NzaTEST")
        .args(["preview", "--config", "stack.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("managed_cluster"));
}

#[test]
fn test_invalid_ssh_key_is_a_declaration_error() {
    let dir = stack_dir("config:\n  sshPublicKey: not-a-key\n");
    skyform_cmd()
        .current_dir(dir.path())
        .args(["preview", "--config", "stack.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[SKY-012]"))
        .stderr(predicate::str::contains("managed_cluster"));
}

#[test]
fn test_missing_html_file_fails() {
    let dir = stack_dir(STACK);
    skyform_cmd()
        .current_dir(dir.path())
        .args(["preview", "--config", "stack.yaml", "--html", "missing.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.html"));
}

// ============================================================================
// up
// ============================================================================

#[test]
fn test_up_prints_frontend_ip() {
    let dir = stack_dir(STACK);
    skyform_cmd()
        .current_dir(dir.path())
        .args(["up", "--config", "stack.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nginx-lb"))
        .stdout(predicate::str::contains("frontend_IP = 20.81.10.7"));
}

#[test]
fn test_up_writes_event_log() {
    let dir = stack_dir(STACK);
    skyform_cmd()
        .current_dir(dir.path())
        .args(["up", "--config", "stack.yaml", "--events", "events.json"])
        .assert()
        .success();

    let content = fs::read_to_string(dir.path().join("events.json")).unwrap();
    let events: serde_json::Value = serde_json::from_str(&content).unwrap();
    let events = events.as_array().unwrap();
    assert_eq!(events[0]["kind"]["type"], "deployment_started");
    assert!(events
        .iter()
        .any(|e| e["kind"]["type"] == "export_resolved" && e["kind"]["name"] == "frontend_IP"));
}

#[test]
fn test_up_with_teardown() {
    let dir = stack_dir(STACK);
    skyform_cmd()
        .current_dir(dir.path())
        .args(["up", "--config", "stack.yaml", "--teardown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Torn down"));
}

#[test]
fn test_bad_engine_settings_fail() {
    let dir = stack_dir(
        "config:\n  sshPublicKey: ssh-rsa AAAA\nengine:\n  poll_interval_ms: 900\n  status_timeout_ms: 100\n",
    );
    skyform_cmd()
        .current_dir(dir.path())
        .env_remove("SKYFORM_POLL_INTERVAL_MS")
        .args(["up", "--config", "stack.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[SKY-002]"));
}
