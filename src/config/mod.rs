//! Project configuration.
//!
//! Settings come from `shipyard.toml` in the project directory. The account
//! identifier and region are read from the process environment once, at
//! startup, and validated together with the file so that a missing value is
//! reported before any stage touches the outside world.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::deploy::environment::Environment;
use crate::deploy::policy::{PolicyTable, StageId, StagePolicy};
use crate::deploy::retry::RetryPolicy;
use crate::error::{DeployError, ErrorCode, Result};
use crate::subprocess::{RemoteBackend, TfVars};

pub const CONFIG_FILE_NAME: &str = "shipyard.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Project name; namespaces state keys and default resource names
    pub project: String,

    #[serde(default)]
    pub env: EnvVarNames,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub infra: InfraSettings,

    #[serde(default)]
    pub outputs: OutputSettings,

    #[serde(default)]
    pub frontend: FrontendSettings,

    #[serde(default)]
    pub cdn: CdnSettings,

    /// Per-stage overrides of the default policy table
    #[serde(default)]
    pub policy: BTreeMap<StageId, StagePolicy>,
}

/// Environment variables holding the ambient cloud settings.
///
/// Each list is searched in order; the first non-empty value wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVarNames {
    #[serde(default = "default_account_id_vars")]
    pub account_id: Vec<String>,
    #[serde(default = "default_region_vars")]
    pub region: Vec<String>,
}

fn default_account_id_vars() -> Vec<String> {
    vec!["AWS_ACCOUNT_ID".to_string()]
}

fn default_region_vars() -> Vec<String> {
    vec!["AWS_DEFAULT_REGION".to_string(), "AWS_REGION".to_string()]
}

impl Default for EnvVarNames {
    fn default() -> Self {
        Self {
            account_id: default_account_id_vars(),
            region: default_region_vars(),
        }
    }
}

/// Serverless backend package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub dir: PathBuf,
    pub python: String,
    pub venv_dir: PathBuf,
    pub requirements: PathBuf,
    pub container_program: String,
    pub runtime_image: String,
    pub runtime_platform: String,
    /// Source directories or files copied into the package, relative to `dir`
    pub sources: Vec<PathBuf>,
    /// Extra data files or directories copied into the package
    pub data_files: Vec<PathBuf>,
    pub package_dir: PathBuf,
    pub artifact: PathBuf,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("backend"),
            python: "python3".to_string(),
            venv_dir: PathBuf::from(".venv"),
            requirements: PathBuf::from("requirements.txt"),
            container_program: "docker".to_string(),
            runtime_image: "public.ecr.aws/sam/build-python3.12".to_string(),
            runtime_platform: "linux/amd64".to_string(),
            sources: vec![PathBuf::from("app")],
            data_files: Vec::new(),
            package_dir: PathBuf::from("package"),
            artifact: PathBuf::from("lambda.zip"),
        }
    }
}

/// Provisioning tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfraSettings {
    pub program: String,
    pub dir: PathBuf,
    pub bootstrap_dir: PathBuf,
    /// Name template shared by every environment; expands `{project}`,
    /// `{account_id}` and `{region}`
    pub state_bucket: String,
    pub lock_table: String,
    pub state_file: String,
    pub encrypt: bool,
    pub plan_file: String,
    /// Variable file relative to `dir`; may contain `{environment}`
    pub var_file: Option<String>,
    /// `-var` values for plan, apply and destroy (templates allowed)
    pub vars: BTreeMap<String, String>,
    /// `-var` values for the bootstrap configuration (templates allowed)
    pub bootstrap_vars: BTreeMap<String, String>,
}

impl Default for InfraSettings {
    fn default() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("environment".to_string(), "{environment}".to_string());

        let mut bootstrap_vars = BTreeMap::new();
        bootstrap_vars.insert("state_bucket".to_string(), "{state_bucket}".to_string());
        bootstrap_vars.insert("lock_table".to_string(), "{lock_table}".to_string());
        bootstrap_vars.insert("region".to_string(), "{region}".to_string());

        Self {
            program: "terraform".to_string(),
            dir: PathBuf::from("infra"),
            bootstrap_dir: PathBuf::from("infra/bootstrap"),
            state_bucket: "{project}-terraform-state-{account_id}".to_string(),
            lock_table: "{project}-terraform-locks".to_string(),
            state_file: "terraform.tfstate".to_string(),
            encrypt: true,
            plan_file: "tfplan".to_string(),
            var_file: None,
            vars,
            bootstrap_vars,
        }
    }
}

/// Names of the infrastructure outputs later stages read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub bucket: String,
    pub distribution_id: String,
    pub urls: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            bucket: "frontend_bucket_name".to_string(),
            distribution_id: "cloudfront_distribution_id".to_string(),
            urls: vec!["frontend_url".to_string(), "api_url".to_string()],
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendSettings {
    pub dir: PathBuf,
    pub program: String,
    pub install_args: Vec<String>,
    pub build_args: Vec<String>,
    /// Static output directory relative to `dir`
    pub build_dir: PathBuf,
    /// Build-time environment variables mapped to infrastructure output names
    pub env: BTreeMap<String, String>,
}

impl Default for FrontendSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("frontend"),
            program: "npm".to_string(),
            install_args: vec!["ci".to_string()],
            build_args: vec!["run".to_string(), "build".to_string()],
            build_dir: PathBuf::from("dist"),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnSettings {
    pub program: String,
    pub invalidation_paths: Vec<String>,
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            invalidation_paths: vec!["/*".to_string()],
        }
    }
}

/// Placeholders usable in `state_bucket` and `lock_table`
const NAME_PLACEHOLDERS: &[&str] = &["project", "account_id", "region"];

/// Placeholders usable in `bootstrap_vars`
const BOOTSTRAP_PLACEHOLDERS: &[&str] = &[
    "project",
    "account_id",
    "region",
    "state_bucket",
    "lock_table",
];

/// Placeholders usable in `vars` and `var_file`
const VAR_PLACEHOLDERS: &[&str] = &[
    "project",
    "account_id",
    "region",
    "environment",
    "state_bucket",
    "lock_table",
];

/// Replace `{key}` placeholders with their values
pub fn expand_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}

/// Names of `{placeholder}`s in `template` that are not in `known`
pub fn unknown_placeholders(template: &str, known: &[&str]) -> Vec<String> {
    let mut unknown = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !known.contains(&name) && !unknown.iter().any(|u| u == name) {
            unknown.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    unknown
}

fn check_template(field: &str, template: &str, known: &[&str], problems: &mut Vec<String>) {
    for name in unknown_placeholders(template, known) {
        problems.push(format!(
            "`{}` uses unknown placeholder {{{}}} (allowed: {})",
            field,
            name,
            known.join(", ")
        ));
    }
}

fn first_set<F>(names: &[String], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl DeployConfig {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeployError::config_with_code(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("Configuration file not found: {}", path.display()),
                )
            } else {
                DeployError::config(format!("Cannot read {}", path.display())).with_source(e)
            }
        })?;
        Self::from_toml_str(&content).map_err(|e| e.with_context(path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the file and resolve ambient settings through `lookup`.
    ///
    /// All problems are collected into one configuration error.
    pub fn resolve<F>(self, project_dir: &Path, lookup: F) -> Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();

        if self.project.trim().is_empty() {
            problems.push("`project` must not be empty".to_string());
        } else if !self
            .project
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            problems.push(format!(
                "`project` '{}' may only contain letters, digits, '-' or '_'",
                self.project
            ));
        }

        let account_id = first_set(&self.env.account_id, &lookup);
        if account_id.is_none() {
            problems.push(format!(
                "account id is not set (checked {})",
                self.env.account_id.join(", ")
            ));
        }

        let region = first_set(&self.env.region, &lookup);
        if region.is_none() {
            problems.push(format!(
                "region is not set (checked {})",
                self.env.region.join(", ")
            ));
        }

        if self.outputs.bucket.is_empty() {
            problems.push("`outputs.bucket` must name an output".to_string());
        }
        if self.outputs.distribution_id.is_empty() {
            problems.push("`outputs.distribution_id` must name an output".to_string());
        }
        if self.cdn.invalidation_paths.is_empty() {
            problems.push("`cdn.invalidation_paths` must not be empty".to_string());
        }

        let infra = &self.infra;
        let mut templates = vec![
            ("infra.state_bucket".to_string(), &infra.state_bucket, NAME_PLACEHOLDERS),
            ("infra.lock_table".to_string(), &infra.lock_table, NAME_PLACEHOLDERS),
        ];
        if let Some(var_file) = &infra.var_file {
            templates.push(("infra.var_file".to_string(), var_file, VAR_PLACEHOLDERS));
        }
        for (key, value) in &infra.vars {
            templates.push((format!("infra.vars.{}", key), value, VAR_PLACEHOLDERS));
        }
        for (key, value) in &infra.bootstrap_vars {
            templates.push((format!("infra.bootstrap_vars.{}", key), value, BOOTSTRAP_PLACEHOLDERS));
        }
        for (field, template, known) in templates {
            check_template(&field, template, known, &mut problems);
        }

        match (account_id, region) {
            (Some(account_id), Some(region)) if problems.is_empty() => Ok(ResolvedConfig {
                config: self,
                project_dir: project_dir.to_path_buf(),
                account_id,
                region,
            }),
            _ => {
                let code = if problems.iter().any(|p| p.contains("is not set")) {
                    ErrorCode::CONFIG_MISSING_REQUIRED
                } else {
                    ErrorCode::CONFIG_INVALID_VALUE
                };
                Err(DeployError::config_with_code(code, problems.join("; ")))
            }
        }
    }
}

/// Validated configuration with ambient values and absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: DeployConfig,
    pub project_dir: PathBuf,
    pub account_id: String,
    pub region: String,
}

impl ResolvedConfig {
    pub fn project(&self) -> &str {
        &self.config.project
    }

    fn expand(&self, template: &str, environment: Option<&Environment>) -> String {
        let state_bucket = self.state_bucket();
        let lock_table = self.lock_table();
        let mut values = vec![
            ("project", self.project()),
            ("account_id", self.account_id.as_str()),
            ("region", self.region.as_str()),
            ("state_bucket", state_bucket.as_str()),
            ("lock_table", lock_table.as_str()),
        ];
        if let Some(environment) = environment {
            values.push(("environment", environment.as_str()));
        }
        expand_template(template, &values)
    }

    fn base_values(&self) -> [(&str, &str); 3] {
        [
            ("project", self.project()),
            ("account_id", self.account_id.as_str()),
            ("region", self.region.as_str()),
        ]
    }

    pub fn state_bucket(&self) -> String {
        expand_template(&self.config.infra.state_bucket, &self.base_values())
    }

    pub fn lock_table(&self) -> String {
        expand_template(&self.config.infra.lock_table, &self.base_values())
    }

    pub fn backend_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.backend.dir)
    }

    pub fn infra_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.infra.dir)
    }

    pub fn bootstrap_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.infra.bootstrap_dir)
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.frontend.dir)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.backend_dir().join(&self.config.backend.artifact)
    }

    /// Remote state settings for `environment`
    pub fn remote_backend(&self, environment: &Environment) -> RemoteBackend {
        RemoteBackend {
            bucket: self.state_bucket(),
            key: environment.state_key(self.project(), &self.config.infra.state_file),
            region: self.region.clone(),
            lock_table: self.lock_table(),
            encrypt: self.config.infra.encrypt,
        }
    }

    /// Variables shared by plan, apply and destroy
    pub fn tf_vars(&self, environment: &Environment) -> TfVars {
        TfVars {
            vars: self
                .config
                .infra
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), self.expand(v, Some(environment))))
                .collect(),
            var_file: self
                .config
                .infra
                .var_file
                .as_deref()
                .map(|f| PathBuf::from(self.expand(f, Some(environment)))),
        }
    }

    pub fn bootstrap_vars(&self) -> TfVars {
        TfVars {
            vars: self
                .config
                .infra
                .bootstrap_vars
                .iter()
                .map(|(k, v)| (k.clone(), self.expand(v, None)))
                .collect(),
            var_file: None,
        }
    }

    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable::with_overrides(&self.config.policy)
    }
}
