use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// Remote state location handed to `terraform init -reconfigure`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBackend {
    pub bucket: String,
    pub key: String,
    pub region: String,
    pub lock_table: String,
    pub encrypt: bool,
}

impl RemoteBackend {
    /// `-backend-config` arguments in a stable order
    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("-backend-config=bucket={}", self.bucket),
            format!("-backend-config=key={}", self.key),
            format!("-backend-config=region={}", self.region),
            format!("-backend-config=dynamodb_table={}", self.lock_table),
            format!("-backend-config=encrypt={}", self.encrypt),
        ]
    }
}

/// Variables and optional var file passed to plan/apply/destroy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TfVars {
    pub vars: Vec<(String, String)>,
    pub var_file: Option<PathBuf>,
}

impl TfVars {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.vars.len() + 1);
        if let Some(file) = &self.var_file {
            args.push(format!("-var-file={}", file.display()));
        }
        args.extend(self.vars.iter().map(|(k, v)| format!("-var={}={}", k, v)));
        args
    }
}

/// How the environment's workspace became current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceSelection {
    Selected,
    Created,
}

/// Thin wrapper that turns provisioning operations into `terraform` invocations
/// inside one configuration directory.
pub struct TerraformRunner {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    working_dir: PathBuf,
}

impl TerraformRunner {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: &str, working_dir: &Path) -> Self {
        Self {
            runner,
            program: program.to_string(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    fn command<I, S>(&self, args: I) -> ProcessCommandBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ProcessCommandBuilder::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
    }

    async fn run_checked(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let output = self.runner.run(command.clone()).await?;
        output.check(&command)
    }

    /// `terraform init` with whatever backend the directory declares
    pub async fn init(&self) -> Result<(), ProcessError> {
        self.run_checked(self.command(["init", "-input=false"]).build())
            .await
            .map(|_| ())
    }

    /// Re-point the configuration at `backend`, discarding any cached backend
    pub async fn init_reconfigure(&self, backend: &RemoteBackend) -> Result<(), ProcessError> {
        let command = self
            .command(["init", "-input=false", "-reconfigure"])
            .args(backend.to_args())
            .build();
        self.run_checked(command).await.map(|_| ())
    }

    /// Apply the configuration directly, without a saved plan
    pub async fn apply_auto_approve(&self, vars: &TfVars) -> Result<(), ProcessError> {
        let command = self
            .command(["apply", "-input=false", "-auto-approve"])
            .args(vars.to_args())
            .build();
        self.run_checked(command).await.map(|_| ())
    }

    /// Select `name`, creating the workspace when selection fails.
    ///
    /// Only a non-zero exit from `workspace select` falls through to creation;
    /// a missing binary, spawn failure or signal is returned as is.
    pub async fn select_or_create_workspace(
        &self,
        name: &str,
    ) -> Result<WorkspaceSelection, ProcessError> {
        let select = self.command(["workspace", "select", name]).build();
        let output = self.runner.run(select.clone()).await?;
        match output.status {
            ExitStatus::Success => return Ok(WorkspaceSelection::Selected),
            ExitStatus::Signal(_) => {
                output.check(&select)?;
            }
            ExitStatus::Error(_) => {}
        }

        tracing::info!("Workspace '{}' not found, creating it", name);
        self.run_checked(self.command(["workspace", "new", name]).build())
            .await?;
        Ok(WorkspaceSelection::Created)
    }

    pub async fn destroy(&self, vars: &TfVars) -> Result<(), ProcessError> {
        let command = self
            .command(["destroy", "-input=false", "-auto-approve"])
            .args(vars.to_args())
            .build();
        self.run_checked(command).await.map(|_| ())
    }

    /// Compute and display a change plan, saving it to `plan_file`
    pub async fn plan(&self, vars: &TfVars, plan_file: &str) -> Result<(), ProcessError> {
        let out = format!("-out={}", plan_file);
        let command = self
            .command(["plan", "-input=false", out.as_str()])
            .args(vars.to_args())
            .build();
        self.run_checked(command).await.map(|_| ())
    }

    /// Apply a previously saved plan without prompting
    pub async fn apply_plan(&self, plan_file: &str) -> Result<(), ProcessError> {
        let command = self
            .command(["apply", "-input=false", "-auto-approve", plan_file])
            .build();
        self.run_checked(command).await.map(|_| ())
    }

    /// Raw `terraform output -json` document
    pub async fn output_json(&self) -> Result<String, ProcessError> {
        let command = self.command(["output", "-json"]).capture_output().build();
        self.run_checked(command).await.map(|out| out.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;

    fn terraform(mock: &MockProcessRunner) -> TerraformRunner {
        TerraformRunner::new(Arc::new(mock.clone()), "terraform", Path::new("infra"))
    }

    #[test]
    fn test_backend_args_carry_every_setting() {
        let backend = RemoteBackend {
            bucket: "shop-terraform-state-123".to_string(),
            key: "shop/dev/terraform.tfstate".to_string(),
            region: "eu-west-1".to_string(),
            lock_table: "shop-terraform-locks".to_string(),
            encrypt: true,
        };
        assert_eq!(
            backend.to_args(),
            vec![
                "-backend-config=bucket=shop-terraform-state-123",
                "-backend-config=key=shop/dev/terraform.tfstate",
                "-backend-config=region=eu-west-1",
                "-backend-config=dynamodb_table=shop-terraform-locks",
                "-backend-config=encrypt=true",
            ]
        );
    }

    #[test]
    fn test_var_file_comes_before_vars() {
        let vars = TfVars {
            vars: vec![("environment".to_string(), "dev".to_string())],
            var_file: Some(PathBuf::from("dev.tfvars")),
        };
        assert_eq!(
            vars.to_args(),
            vec!["-var-file=dev.tfvars", "-var=environment=dev"]
        );
    }

    #[tokio::test]
    async fn test_existing_workspace_is_selected() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args_prefix(&["workspace", "select", "dev"])
            .returns_success()
            .finish();

        let selection = terraform(&mock)
            .select_or_create_workspace("dev")
            .await
            .unwrap();

        assert_eq!(selection, WorkspaceSelection::Selected);
        assert!(mock.position_of("workspace new").is_none());
    }

    #[tokio::test]
    async fn test_missing_workspace_is_created() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args_prefix(&["workspace", "select"])
            .returns_exit_code(1)
            .returns_stderr("Workspace \"qa\" doesn't exist.")
            .finish();
        mock.expect_command("terraform")
            .with_args_prefix(&["workspace", "new", "qa"])
            .returns_success()
            .finish();

        let selection = terraform(&mock)
            .select_or_create_workspace("qa")
            .await
            .unwrap();

        assert_eq!(selection, WorkspaceSelection::Created);
        assert_eq!(
            mock.command_lines(),
            vec!["terraform workspace select qa", "terraform workspace new qa"]
        );
    }

    #[tokio::test]
    async fn test_workspace_creation_failure_is_reported() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args_prefix(&["workspace"])
            .returns_exit_code(1)
            .finish();

        let err = terraform(&mock)
            .select_or_create_workspace("qa")
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::ExitCode { code: 1, .. }));
        assert!(err.to_string().contains("workspace new qa"));
    }

    #[tokio::test]
    async fn test_missing_binary_does_not_attempt_creation() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform").returns_not_found().finish();

        let err = terraform(&mock)
            .select_or_create_workspace("dev")
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::CommandNotFound(_)));
        assert_eq!(mock.command_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupted_select_does_not_attempt_creation() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args_prefix(&["workspace", "select"])
            .returns_signal(2)
            .finish();
        mock.expect_command("terraform")
            .with_args_prefix(&["workspace", "new"])
            .returns_success()
            .finish();

        let err = terraform(&mock)
            .select_or_create_workspace("prod")
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::Signal { signal: 2, .. }));
        assert_eq!(err.exit_code(), Some(130));
        assert_eq!(mock.command_lines(), vec!["terraform workspace select prod"]);
    }

    #[tokio::test]
    async fn test_output_json_captures_stdout() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args_prefix(&["output", "-json"])
            .returns_stdout("{}")
            .finish();

        let json = terraform(&mock).output_json().await.unwrap();
        assert_eq!(json, "{}");

        let history = mock.get_call_history();
        assert_eq!(history[0].output, crate::subprocess::OutputMode::Capture);
        assert_eq!(history[0].working_dir.as_deref(), Some(Path::new("infra")));
    }
}
