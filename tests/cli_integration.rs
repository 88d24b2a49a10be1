//! CLI integration tests
//!
//! These tests verify the command-line interface behavior, including:
//! - Command parsing and help output
//! - Configuration display
//! - Exit codes for failed runs

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the cloud-importer binary
fn cloud_importer_bin() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .to_path_buf();

    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("cloud-importer")
}

fn cloud_importer() -> Command {
    let mut cmd = Command::new(cloud_importer_bin());
    for var in [
        "ARM_SUBSCRIPTION_ID",
        "AZURE_ACCESS_TOKEN",
        "ARM_LOCATION_NAME",
        "CLOUD_IMPORTER_ARM_ENDPOINT",
        "CLOUD_IMPORTER_REQUEST_TIMEOUT",
        "CLOUD_IMPORTER_POLL_INTERVAL",
        "CLOUD_IMPORTER_WORK_DIR",
        "CLOUD_IMPORTER_BUNDLE_EXTRACT_CMD",
        "CLOUD_IMPORTER_LOG_LEVEL",
        "CLOUD_IMPORTER_LOG_JSON",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_help() {
    let output = cloud_importer()
        .arg("--help")
        .output()
        .expect("Failed to execute cloud-importer");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cloud-importer"));
    assert!(stdout.contains("ephemeral-raw"));
    assert!(stdout.contains("ephemeral-bundle"));
    assert!(stdout.contains("register"));
}

#[test]
fn test_cli_version() {
    let output = cloud_importer()
        .arg("--version")
        .output()
        .expect("Failed to execute cloud-importer");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_register_help_lists_flags() {
    let output = cloud_importer()
        .args(["register", "--help"])
        .output()
        .expect("Failed to execute cloud-importer");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--replicate"));
    assert!(stdout.contains("--org-tenant-id"));
}

#[test]
fn test_config_json_output() {
    let output = cloud_importer()
        .args(["config", "--format", "json"])
        .env("ARM_LOCATION_NAME", "northeurope")
        .output()
        .expect("Failed to execute cloud-importer");

    assert!(output.status.success());
    let config: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config output is JSON");
    assert_eq!(config["location"], "northeurope");
    assert_eq!(config["subscription_id"], "(unset)");
}

#[test]
fn test_config_human_output() {
    let output = cloud_importer()
        .arg("config")
        .output()
        .expect("Failed to execute cloud-importer");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cloud-importer Configuration"));
    assert!(stdout.contains("ARM Endpoint"));
}

#[test]
fn test_register_missing_outputs_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.json");

    let output = cloud_importer()
        .args(["register", "--outputs"])
        .arg(&missing)
        .output()
        .expect("Failed to execute cloud-importer");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.json"));
}

#[test]
fn test_register_incomplete_outputs_names_missing_key() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("outputs.json");
    fs::write(&path, r#"{"name": "rhelai-1.2", "arch": "x86_64"}"#).unwrap();

    let output = cloud_importer()
        .args(["register", "--outputs"])
        .arg(&path)
        .output()
        .expect("Failed to execute cloud-importer");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("output not found: offer"));
}

#[test]
fn test_invalid_format_rejected() {
    let output = cloud_importer()
        .args(["config", "--format", "xml"])
        .output()
        .expect("Failed to execute cloud-importer");

    assert!(!output.status.success());
}

#[test]
fn test_invalid_config_fails_ephemeral_run() {
    let output = cloud_importer()
        .args([
            "ephemeral-raw",
            "--vhd-path",
            "disk.vhd",
            "--image-name",
            "rhelai-1.2",
        ])
        .env("CLOUD_IMPORTER_POLL_INTERVAL", "0")
        .output()
        .expect("Failed to execute cloud-importer");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Poll interval"));
}

#[test]
fn test_missing_vhd_fails_before_any_azure_call() {
    let temp_dir = TempDir::new().unwrap();

    let output = cloud_importer()
        .args(["ephemeral-raw", "--vhd-path", "no-such-disk.vhd", "--image-name", "rhelai-1.2"])
        .current_dir(temp_dir.path())
        .env("CLOUD_IMPORTER_WORK_DIR", temp_dir.path().join("work"))
        .output()
        .expect("Failed to execute cloud-importer");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VHD file no-such-disk.vhd not found"));
    assert!(output.stdout.is_empty());
}
