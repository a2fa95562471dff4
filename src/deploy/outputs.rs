//! Typed view over `terraform output -json`.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::OutputSettings;
use crate::error::{DeployError, ErrorCode, Result};

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    value: serde_json::Value,
}

/// Infrastructure values later stages depend on
#[derive(Debug, Clone, PartialEq)]
pub struct InfraOutputs {
    pub bucket: String,
    pub distribution_id: String,
    /// Configured URL outputs as `(output name, url)` in configured order
    pub urls: Vec<(String, String)>,
    values: BTreeMap<String, serde_json::Value>,
}

fn string_value(name: &str, value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(DeployError::output(
            ErrorCode::OUTPUT_INVALID_TYPE,
            format!("expected a scalar value, found {}", other),
            Some(name.to_string()),
        )),
    }
}

impl InfraOutputs {
    /// Parse the provisioning tool's JSON, requiring every configured output
    pub fn parse(json: &str, settings: &OutputSettings) -> Result<Self> {
        let raw: BTreeMap<String, RawOutput> = serde_json::from_str(json)?;

        let values: BTreeMap<String, serde_json::Value> = raw
            .into_iter()
            .map(|(name, output)| (name, output.value))
            .collect();

        let mut outputs = Self {
            bucket: String::new(),
            distribution_id: String::new(),
            urls: Vec::new(),
            values,
        };
        outputs.bucket = outputs.require(&settings.bucket)?;
        outputs.distribution_id = outputs.require(&settings.distribution_id)?;
        outputs.urls = settings
            .urls
            .iter()
            .map(|name| outputs.require(name).map(|url| (name.clone(), url)))
            .collect::<Result<Vec<_>>>()?;
        Ok(outputs)
    }

    /// Scalar output by name, failing when it is not defined
    pub fn require(&self, name: &str) -> Result<String> {
        let value = self.values.get(name).ok_or_else(|| {
            DeployError::output(
                ErrorCode::OUTPUT_NOT_DEFINED,
                "output is not defined in the infrastructure state",
                Some(name.to_string()),
            )
        })?;
        string_value(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }
}
