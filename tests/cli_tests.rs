//! Integration tests for the CLI interface
//!
//! Everything here fails before the first external command would run.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn shipyard() -> Command {
    let mut cmd = Command::cargo_bin("shipyard").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("AWS_ACCOUNT_ID")
        .env_remove("AWS_DEFAULT_REGION")
        .env_remove("AWS_REGION");
    cmd
}

#[test]
fn test_cli_help_flag() {
    shipyard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("[ENVIRONMENT]"))
        .stdout(predicate::str::contains("[DESTROY]"))
        .stdout(predicate::str::contains("--project-dir"));
}

#[test]
fn test_missing_config_file_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    shipyard()
        .args(["staging", "false", "-C"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_missing_project_dir_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    shipyard()
        .arg("-C")
        .arg(dir.path().join("nope"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Project directory not found"));
}

#[test]
fn test_missing_ambient_settings_are_reported_together() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shipyard.toml"), "project = \"shop\"\n").unwrap();

    shipyard()
        .arg("-C")
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("account id is not set"))
        .stderr(predicate::str::contains("region is not set"))
        .stdout(predicate::str::contains("Run summary").not());
}

#[test]
fn test_invalid_toml_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shipyard.toml"), "project = [").unwrap();

    shipyard()
        .arg("-C")
        .arg(dir.path())
        .env("AWS_ACCOUNT_ID", "123456789012")
        .env("AWS_DEFAULT_REGION", "eu-west-1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn test_explicit_config_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("deploy.toml");
    fs::write(&config, "project = \"\"\n").unwrap();

    shipyard()
        .arg("-C")
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .env("AWS_ACCOUNT_ID", "123456789012")
        .env("AWS_DEFAULT_REGION", "eu-west-1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("`project` must not be empty"));
}

#[test]
fn test_invalid_environment_name() {
    let dir = TempDir::new().unwrap();
    shipyard()
        .args(["prod/eu", "-C"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment name 'prod/eu'"));
}

#[test]
fn test_too_many_arguments() {
    shipyard()
        .args(["dev", "false", "extra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
