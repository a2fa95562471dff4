//! Linear deployment pipeline.
//!
//! Stages run strictly in order. Each one goes through [`Orchestrator::run_stage`],
//! which records the result and consults the [`PolicyTable`] to decide whether a
//! failure ends the run.

use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

use super::environment::Environment;
use super::frontend::FrontendBuilder;
use super::outcome::{BootstrapStatus, RunOutcome, StageStatus};
use super::outputs::InfraOutputs;
use super::package::BackendPackager;
use super::policy::{PolicyTable, StageId};
use crate::config::ResolvedConfig;
use crate::error::{DeployError, Result};
use crate::subprocess::{SubprocessManager, TerraformRunner, WorkspaceSelection};

const OUTPUTS_UNAVAILABLE: &str = "infrastructure outputs unavailable";

pub struct Orchestrator {
    config: ResolvedConfig,
    subprocess: SubprocessManager,
    policies: PolicyTable,
}

impl Orchestrator {
    pub fn new(config: ResolvedConfig, subprocess: SubprocessManager) -> Self {
        let policies = config.policy_table();
        Self {
            config,
            subprocess,
            policies,
        }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Deploy `environment`, tearing it down first when `destroy` is set.
    ///
    /// Never returns early with an error: the failure that ended the run is
    /// stored in the outcome next to the stages that completed before it.
    pub async fn run(&self, environment: Environment, destroy: bool) -> RunOutcome {
        info!(
            "Deploying '{}' to environment '{}'",
            self.config.project(),
            environment
        );
        let mut outcome = RunOutcome::new(environment, destroy);
        if let Err(err) = self.run_stages(&mut outcome).await {
            error!("Deployment failed: {}", err);
            outcome.error = Some(err);
        }
        outcome
    }

    /// Execute one stage and apply its policy.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` for a tolerated
    /// failure and `Err` for a fatal one.
    async fn run_stage<T, F>(
        &self,
        outcome: &mut RunOutcome,
        stage: StageId,
        work: F,
    ) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        info!("==> {}", stage.title());
        let started_at = Utc::now();
        let start = Instant::now();

        match work.await {
            Ok(value) => {
                outcome.record(stage, StageStatus::Succeeded, started_at, start.elapsed());
                Ok(Some(value))
            }
            Err(err) if self.policies.is_fatal(stage) => {
                error!("Stage '{}' failed: {}", stage, err);
                let status = StageStatus::Failed {
                    error: err.to_string(),
                    exit_code: err.exit_code(),
                };
                outcome.record(stage, status, started_at, start.elapsed());
                Err(err.with_context(format!("stage '{}'", stage)))
            }
            Err(err) => {
                warn!("Stage '{}' failed, continuing: {}", stage, err);
                outcome.record(
                    stage,
                    StageStatus::Tolerated(err.to_string()),
                    started_at,
                    start.elapsed(),
                );
                Ok(None)
            }
        }
    }

    async fn run_stages(&self, outcome: &mut RunOutcome) -> Result<()> {
        let environment = outcome.environment.clone();
        let infra = &self.config.config.infra;
        let terraform = self.subprocess.terraform(&infra.program, &self.config.infra_dir());

        self.run_stage(outcome, StageId::Build, self.build_backend())
            .await?;

        self.bootstrap_backend(outcome).await?;

        self.run_stage(
            outcome,
            StageId::InfraInit,
            self.init_infra(&terraform, &environment),
        )
        .await?;

        let vars = self.config.tf_vars(&environment);
        if outcome.destroy_requested {
            self.run_stage(outcome, StageId::Destroy, async {
                terraform.destroy(&vars).await.map_err(DeployError::from)
            })
            .await?;
        } else {
            outcome.skip(StageId::Destroy, "destroy flag not set");
        }

        self.run_stage(outcome, StageId::InfraApply, async {
            terraform.plan(&vars, &infra.plan_file).await?;
            terraform.apply_plan(&infra.plan_file).await?;
            Ok::<_, DeployError>(())
        })
        .await?;

        let outputs = self
            .run_stage(outcome, StageId::Outputs, self.read_outputs(&terraform))
            .await?;
        outcome.outputs = outputs.clone();

        match &outputs {
            Some(outputs) => self.deliver_frontend(outcome, outputs).await?,
            None => {
                for stage in [
                    StageId::FrontendBuild,
                    StageId::FrontendPublish,
                    StageId::CacheInvalidation,
                ] {
                    outcome.skip(stage, OUTPUTS_UNAVAILABLE);
                }
            }
        }

        let summary = summary_lines(&self.config, &environment, outputs.as_ref());
        self.run_stage(outcome, StageId::Summary, async {
            for line in &summary {
                println!("{}", line);
            }
            Ok::<_, DeployError>(())
        })
        .await?;

        Ok(())
    }

    async fn build_backend(&self) -> Result<PathBuf> {
        BackendPackager::new(
            &self.subprocess,
            &self.config.config.backend,
            self.config.backend_dir(),
        )
        .build()
        .await
    }

    /// Apply the state-backend definition when the project carries one
    async fn bootstrap_backend(&self, outcome: &mut RunOutcome) -> Result<()> {
        let bootstrap_dir = self.config.bootstrap_dir();
        if !bootstrap_dir.is_dir() {
            warn!(
                "No bootstrap configuration at {}; assuming the remote state backend already exists",
                bootstrap_dir.display()
            );
            outcome.bootstrap = BootstrapStatus::AbsentSkipped;
            outcome.skip(
                StageId::BackendBootstrap,
                "no bootstrap configuration, existing backend assumed",
            );
            return Ok(());
        }

        let result = self
            .run_stage(
                outcome,
                StageId::BackendBootstrap,
                self.apply_bootstrap(&bootstrap_dir),
            )
            .await;
        outcome.bootstrap = match &result {
            Ok(Some(())) => BootstrapStatus::Applied,
            _ => BootstrapStatus::Failed,
        };
        result.map(|_| ())
    }

    async fn apply_bootstrap(&self, bootstrap_dir: &Path) -> Result<()> {
        let terraform = self
            .subprocess
            .terraform(&self.config.config.infra.program, bootstrap_dir);
        terraform.init().await?;
        terraform
            .apply_auto_approve(&self.config.bootstrap_vars())
            .await?;
        info!(
            "Remote state backend ready: bucket {}, lock table {}",
            self.config.state_bucket(),
            self.config.lock_table()
        );
        Ok(())
    }

    /// Point at the environment's state key and make its workspace current
    async fn init_infra(
        &self,
        terraform: &TerraformRunner,
        environment: &Environment,
    ) -> Result<WorkspaceSelection> {
        let backend = self.config.remote_backend(environment);
        info!("Using remote state s3://{}/{}", backend.bucket, backend.key);
        terraform
            .init_reconfigure(&backend)
            .await
            .map_err(|e| DeployError::from(e).with_context("initialize remote state"))?;

        let selection = terraform
            .select_or_create_workspace(environment.as_str())
            .await
            .map_err(|e| DeployError::from(e).with_context("select workspace"))?;
        Ok(selection)
    }

    /// The one retried operation: reading outputs has no side effects
    async fn read_outputs(&self, terraform: &TerraformRunner) -> Result<InfraOutputs> {
        let settings = &self.config.config.outputs;
        let json = settings
            .retry
            .run("terraform output", || terraform.output_json())
            .await?;
        InfraOutputs::parse(&json, settings)
    }

    async fn deliver_frontend(&self, outcome: &mut RunOutcome, outputs: &InfraOutputs) -> Result<()> {
        let frontend = &self.config.config.frontend;
        let builder = FrontendBuilder::new(&self.subprocess, frontend, self.config.frontend_dir());

        let build_dir = self
            .run_stage(outcome, StageId::FrontendBuild, builder.build(outputs))
            .await?;

        let cloud = self
            .subprocess
            .cloud(&self.config.config.cdn.program, &self.config.region);

        match build_dir {
            Some(build_dir) => {
                self.run_stage(outcome, StageId::FrontendPublish, async {
                    cloud
                        .sync_mirror(&build_dir, &outputs.bucket)
                        .await
                        .map_err(DeployError::from)
                })
                .await?;
            }
            None => outcome.skip(StageId::FrontendPublish, "frontend build unavailable"),
        }

        let paths = &self.config.config.cdn.invalidation_paths;
        self.run_stage(outcome, StageId::CacheInvalidation, async {
            match cloud
                .create_invalidation(&outputs.distribution_id, paths)
                .await?
            {
                Some(id) => info!("Created invalidation {}", id),
                None => info!("Invalidation requested"),
            }
            Ok::<_, DeployError>(())
        })
        .await?;

        Ok(())
    }
}

/// Final lines shown to the operator
fn summary_lines(
    config: &ResolvedConfig,
    environment: &Environment,
    outputs: Option<&InfraOutputs>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Deployed {} to {} ({})",
        config.project(),
        environment,
        config.region
    )];
    match outputs {
        Some(outputs) => lines.extend(
            outputs
                .urls
                .iter()
                .map(|(name, url)| format!("  {}: {}", name, url)),
        ),
        None => lines.push(format!("  {}", OUTPUTS_UNAVAILABLE)),
    }
    lines
}
