use std::fmt;
use std::str::FromStr;

use crate::error::{DeployError, ErrorCode, Result};

pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Literal value of the destroy argument that requests a teardown
pub const DESTROY_FLAG_VALUE: &str = "true";

/// A deployment target such as `dev` or `prod`.
///
/// The name selects the provisioning workspace and namespaces the remote
/// state key, so it is restricted to characters that are safe in both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(DeployError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_INPUT,
                "environment name must not be empty",
                Some("environment".to_string()),
            ));
        }

        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(DeployError::validation_with_code(
                ErrorCode::VALIDATION_PATTERN_MISMATCH,
                format!(
                    "environment name '{}' contains '{}'; use letters, digits, '-' or '_'",
                    name, bad
                ),
                Some("environment".to_string()),
            ));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote state key for this environment: `{project}/{environment}/{state_file}`
    pub fn state_key(&self, project: &str, state_file: &str) -> String {
        format!("{}/{}/{}", project, self.0, state_file)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self(DEFAULT_ENVIRONMENT.to_string())
    }
}

impl FromStr for Environment {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Only the exact literal `true` requests a teardown
pub fn destroy_requested(flag: &str) -> bool {
    flag == DESTROY_FLAG_VALUE
}
