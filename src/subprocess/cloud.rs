use std::path::Path;
use std::sync::Arc;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::ProcessRunner;

/// Object-storage sync and CDN invalidation through the cloud CLI
pub struct CloudCli {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    region: String,
}

/// Extract the invalidation id from `create-invalidation` JSON output
fn parse_invalidation_id(stdout: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(stdout).ok()?;
    value
        .get("Invalidation")?
        .get("Id")?
        .as_str()
        .map(str::to_string)
}

impl CloudCli {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: &str, region: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
            region: region.to_string(),
        }
    }

    /// Mirror `source` into the bucket; objects missing locally are deleted
    pub async fn sync_mirror(&self, source: &Path, bucket: &str) -> Result<(), ProcessError> {
        let source = source.display().to_string();
        let target = format!("s3://{}", bucket);
        let command = ProcessCommandBuilder::new(&self.program)
            .args(["s3", "sync", source.as_str(), target.as_str(), "--delete"])
            .args(["--region", self.region.as_str()])
            .build();
        let output = self.runner.run(command.clone()).await?;
        output.check(&command).map(|_| ())
    }

    /// Request invalidation of `paths`; returns the invalidation id when the
    /// CLI reports one. Completion is not awaited.
    pub async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
    ) -> Result<Option<String>, ProcessError> {
        let command = ProcessCommandBuilder::new(&self.program)
            .args(["cloudfront", "create-invalidation", "--distribution-id"])
            .arg(distribution_id)
            .arg("--paths")
            .args(paths)
            .args(["--output", "json"])
            .capture_output()
            .build();
        let output = self.runner.run(command.clone()).await?;
        let output = output.check(&command)?;
        Ok(parse_invalidation_id(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;

    #[test]
    fn test_parse_invalidation_id() {
        let stdout = r#"{"Location": "https://x", "Invalidation": {"Id": "I2J0Y4", "Status": "InProgress"}}"#;
        assert_eq!(parse_invalidation_id(stdout), Some("I2J0Y4".to_string()));
        assert_eq!(parse_invalidation_id("not json"), None);
        assert_eq!(parse_invalidation_id("{}"), None);
    }

    #[tokio::test]
    async fn test_sync_uses_delete_for_mirror_semantics() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("aws").returns_success().finish();

        let cli = CloudCli::new(Arc::new(mock.clone()), "aws", "us-east-1");
        cli.sync_mirror(Path::new("frontend/dist"), "shop-site")
            .await
            .unwrap();

        assert_eq!(
            mock.command_lines(),
            vec!["aws s3 sync frontend/dist s3://shop-site --delete --region us-east-1"]
        );
    }

    #[tokio::test]
    async fn test_invalidation_failure_carries_exit_code() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("aws").returns_exit_code(254).finish();

        let cli = CloudCli::new(Arc::new(mock.clone()), "aws", "us-east-1");
        let err = cli
            .create_invalidation("E123", &["/*".to_string()])
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(254));
        assert!(mock.command_lines()[0].ends_with("--paths /* --output json"));
    }
}
