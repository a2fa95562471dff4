use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::args::Cli;
use crate::config::{DeployConfig, ResolvedConfig, CONFIG_FILE_NAME};
use crate::deploy::{destroy_requested, Environment, Orchestrator};
use crate::error::{DeployError, ErrorCode, Result};
use crate::subprocess::SubprocessManager;

fn project_root(dir: &Path) -> Result<PathBuf> {
    dir.canonicalize().map_err(|e| {
        DeployError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("Project directory not found: {}", dir.display()),
        )
        .with_source(e)
    })
}

/// Load and validate everything the run needs before any command is issued
pub fn prepare(cli: &Cli) -> Result<(Environment, bool, ResolvedConfig)> {
    let environment = Environment::new(&cli.environment)?;
    let destroy = destroy_requested(&cli.destroy);
    if !destroy && cli.destroy != "false" {
        info!(
            "Destroy argument '{}' is not 'true'; teardown will be skipped",
            cli.destroy
        );
    }

    let project_dir = project_root(&cli.project_dir)?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));
    debug!("Loading configuration from {}", config_path.display());

    let config = DeployConfig::load(&config_path)?
        .resolve(&project_dir, |name| std::env::var(name).ok())?;
    Ok((environment, destroy, config))
}

/// Run a deployment and return the process exit code
pub async fn execute(cli: Cli) -> anyhow::Result<i32> {
    let (environment, destroy, config) = prepare(&cli)?;

    let orchestrator = Orchestrator::new(config, SubprocessManager::production());
    let outcome = orchestrator.run(environment, destroy).await;

    println!("{}", outcome);
    Ok(outcome.exit_code())
}
