use std::path::PathBuf;
use tracing::debug;

use super::outputs::InfraOutputs;
use crate::config::FrontendSettings;
use crate::error::{DeployError, ErrorCode, Result};
use crate::subprocess::{ProcessCommandBuilder, SubprocessManager};

/// Installs frontend dependencies and produces the static build
pub struct FrontendBuilder<'a> {
    subprocess: &'a SubprocessManager,
    settings: &'a FrontendSettings,
    frontend_dir: PathBuf,
}

impl<'a> FrontendBuilder<'a> {
    pub fn new(
        subprocess: &'a SubprocessManager,
        settings: &'a FrontendSettings,
        frontend_dir: PathBuf,
    ) -> Self {
        Self {
            subprocess,
            settings,
            frontend_dir,
        }
    }

    /// Build-time variables taken from infrastructure outputs
    pub fn build_env(&self, outputs: &InfraOutputs) -> Result<Vec<(String, String)>> {
        self.settings
            .env
            .iter()
            .map(|(var, output)| {
                outputs
                    .require(output)
                    .map(|value| (var.clone(), value))
                    .map_err(|e| e.with_context(format!("frontend variable {}", var)))
            })
            .collect()
    }

    /// Run install and build, returning the static output directory
    pub async fn build(&self, outputs: &InfraOutputs) -> Result<PathBuf> {
        let env = self.build_env(outputs)?;

        let install = ProcessCommandBuilder::new(&self.settings.program)
            .args(&self.settings.install_args)
            .current_dir(&self.frontend_dir)
            .build();
        self.subprocess
            .run_checked(install)
            .await
            .map_err(|e| DeployError::from(e).with_context("install frontend dependencies"))?;

        for (key, _) in &env {
            debug!("Exporting {} to the frontend build", key);
        }
        let build = ProcessCommandBuilder::new(&self.settings.program)
            .args(&self.settings.build_args)
            .envs(env)
            .current_dir(&self.frontend_dir)
            .build();
        self.subprocess
            .run_checked(build)
            .await
            .map_err(|e| DeployError::from(e).with_context("build frontend"))?;

        let build_dir = self.frontend_dir.join(&self.settings.build_dir);
        if !build_dir.is_dir() {
            return Err(DeployError::storage_with_code(
                ErrorCode::STORAGE_NOT_FOUND,
                "frontend build produced no output directory",
                Some(build_dir),
            ));
        }
        Ok(build_dir)
    }
}
