//! Common test utilities and helpers
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shipyard::config::{DeployConfig, ResolvedConfig};
use shipyard::subprocess::MockProcessRunner;

pub const ACCOUNT_ID: &str = "123456789012";
pub const REGION: &str = "eu-west-1";

pub const OUTPUT_JSON: &str = r#"{
    "frontend_bucket_name": {"sensitive": false, "type": "string", "value": "shop-site"},
    "cloudfront_distribution_id": {"sensitive": false, "type": "string", "value": "E2QWRUHAPOMQZL"},
    "frontend_url": {"sensitive": false, "type": "string", "value": "https://d111.cloudfront.net"},
    "api_url": {"sensitive": false, "type": "string", "value": "https://abc.execute-api.eu-west-1.amazonaws.com"}
}"#;

pub const INVALIDATION_JSON: &str =
    r#"{"Location": "https://cloudfront.amazonaws.com/x", "Invalidation": {"Id": "I2J0Y4", "Status": "InProgress"}}"#;

/// Project layout with backend sources, an infra directory and a frontend
/// whose build output already exists
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("backend/app")).unwrap();
        fs::write(root.join("backend/app/main.py"), "def handler(event, context):\n    return {}\n").unwrap();
        fs::write(root.join("backend/requirements.txt"), "boto3\n").unwrap();
        fs::create_dir_all(root.join("infra")).unwrap();
        fs::create_dir_all(root.join("frontend/dist")).unwrap();
        fs::write(root.join("frontend/dist/index.html"), "<html></html>").unwrap();
        Self { dir }
    }

    pub fn with_bootstrap(self) -> Self {
        fs::create_dir_all(self.path().join("infra/bootstrap")).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn backend_dir(&self) -> PathBuf {
        self.path().join("backend")
    }

    /// Resolve `project = "shop"` plus `extra` with fast output retries
    pub fn config(&self, extra: &str) -> ResolvedConfig {
        let toml = format!(
            "project = \"shop\"\n{}\n[outputs.retry]\ninitial_delay = \"1ms\"\nmax_delay = \"5ms\"\n",
            extra
        );
        DeployConfig::from_toml_str(&toml)
            .unwrap()
            .resolve(self.path(), |name| match name {
                "AWS_ACCOUNT_ID" => Some(ACCOUNT_ID.to_string()),
                "AWS_DEFAULT_REGION" => Some(REGION.to_string()),
                _ => None,
            })
            .unwrap()
    }
}

/// Python, pip and the build container all succeed
pub fn expect_backend_build(mock: &mut MockProcessRunner, project: &TestProject) {
    let pip = project
        .backend_dir()
        .join(".venv/bin/pip")
        .display()
        .to_string();
    mock.expect_command("python3").returns_success().finish();
    mock.expect_command(&pip).returns_success().finish();
    mock.expect_command("docker").returns_success().finish();
}

/// `terraform output -json` answers with [`OUTPUT_JSON`]
pub fn expect_outputs(mock: &mut MockProcessRunner) {
    mock.expect_command("terraform")
        .with_args_prefix(&["output", "-json"])
        .returns_stdout(OUTPUT_JSON)
        .finish();
}

/// Every other terraform invocation succeeds
pub fn expect_terraform_success(mock: &mut MockProcessRunner) {
    mock.expect_command("terraform").returns_success().finish();
}

pub fn expect_frontend_and_cdn(mock: &mut MockProcessRunner) {
    mock.expect_command("npm").returns_success().finish();
    mock.expect_command("aws")
        .with_args_prefix(&["cloudfront"])
        .returns_stdout(INVALIDATION_JSON)
        .finish();
    mock.expect_command("aws").returns_success().finish();
}

/// Index of the first command line starting with `prefix`
pub fn position(lines: &[String], prefix: &str) -> Option<usize> {
    lines.iter().position(|line| line.starts_with(prefix))
}
