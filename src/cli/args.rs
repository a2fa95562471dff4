use clap::Parser;
use std::path::PathBuf;

use crate::deploy::environment::DEFAULT_ENVIRONMENT;

/// Build and deploy a serverless backend, its infrastructure and a static frontend
#[derive(Parser, Debug)]
#[command(name = "shipyard")]
#[command(about = "shipyard - Deploy one environment of a serverless web project", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Target environment; selects the workspace and the state key
    #[arg(default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Tear the environment down before applying; only the literal `true` enables it
    #[arg(default_value = "false", value_name = "DESTROY")]
    pub destroy: String,

    /// Path to the configuration file (defaults to <project-dir>/shipyard.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Project root containing backend, infra and frontend directories
    #[arg(short = 'C', long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}
