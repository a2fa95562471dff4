pub mod builder;
pub mod cloud;
pub mod error;
pub mod mock;
pub mod runner;
pub mod terraform;


pub use builder::ProcessCommandBuilder;
pub use cloud::CloudCli;
pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{ExitStatus, OutputMode, ProcessCommand, ProcessOutput, ProcessRunner};
pub use terraform::{RemoteBackend, TerraformRunner, TfVars, WorkspaceSelection};

use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(runner::TokioProcessRunner))
    }

    /// Manager backed by a fresh mock; the returned handle shares its state
    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    /// Run a command, treating any non-zero exit as an error
    pub async fn run_checked(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let output = self.runner.run(command.clone()).await?;
        output.check(&command)
    }

    pub fn terraform(&self, program: &str, working_dir: &Path) -> TerraformRunner {
        TerraformRunner::new(Arc::clone(&self.runner), program, working_dir)
    }

    pub fn cloud(&self, program: &str, region: &str) -> CloudCli {
        CloudCli::new(Arc::clone(&self.runner), program, region)
    }
}
