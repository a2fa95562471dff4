//! Declarative stage table.
//!
//! Every stage of a deployment is named by a [`StageId`]; whether its failure
//! stops the run is looked up in a [`PolicyTable`] by the generic stage runner
//! rather than decided ad hoc at each call site.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stages of a deployment, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Build,
    BackendBootstrap,
    InfraInit,
    Destroy,
    InfraApply,
    Outputs,
    FrontendBuild,
    FrontendPublish,
    CacheInvalidation,
    Summary,
}

impl StageId {
    pub const ALL: [StageId; 10] = [
        StageId::Build,
        StageId::BackendBootstrap,
        StageId::InfraInit,
        StageId::Destroy,
        StageId::InfraApply,
        StageId::Outputs,
        StageId::FrontendBuild,
        StageId::FrontendPublish,
        StageId::CacheInvalidation,
        StageId::Summary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageId::Build => "build",
            StageId::BackendBootstrap => "backend_bootstrap",
            StageId::InfraInit => "infra_init",
            StageId::Destroy => "destroy",
            StageId::InfraApply => "infra_apply",
            StageId::Outputs => "outputs",
            StageId::FrontendBuild => "frontend_build",
            StageId::FrontendPublish => "frontend_publish",
            StageId::CacheInvalidation => "cache_invalidation",
            StageId::Summary => "summary",
        }
    }

    /// Banner shown when the stage starts
    pub fn title(self) -> &'static str {
        match self {
            StageId::Build => "Building backend package",
            StageId::BackendBootstrap => "Bootstrapping remote state backend",
            StageId::InfraInit => "Initializing infrastructure",
            StageId::Destroy => "Destroying existing infrastructure",
            StageId::InfraApply => "Applying infrastructure",
            StageId::Outputs => "Reading infrastructure outputs",
            StageId::FrontendBuild => "Building frontend",
            StageId::FrontendPublish => "Publishing frontend",
            StageId::CacheInvalidation => "Invalidating CDN cache",
            StageId::Summary => "Summary",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the stage runner treats a failing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicy {
    /// Abort the run on failure; when false the failure is logged and skipped
    pub fatal: bool,
}

impl StagePolicy {
    pub const FATAL: StagePolicy = StagePolicy { fatal: true };
    pub const TOLERATED: StagePolicy = StagePolicy { fatal: false };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: BTreeMap<StageId, StagePolicy>,
}

impl Default for PolicyTable {
    /// Fail fast everywhere except teardown, which is best effort
    fn default() -> Self {
        let policies = StageId::ALL
            .iter()
            .map(|&stage| {
                let policy = match stage {
                    StageId::Destroy => StagePolicy::TOLERATED,
                    _ => StagePolicy::FATAL,
                };
                (stage, policy)
            })
            .collect();
        Self { policies }
    }
}

impl PolicyTable {
    /// Default table with per-stage entries replaced by `overrides`
    pub fn with_overrides(overrides: &BTreeMap<StageId, StagePolicy>) -> Self {
        let mut table = Self::default();
        for (&stage, &policy) in overrides {
            table.policies.insert(stage, policy);
        }
        table
    }

    pub fn get(&self, stage: StageId) -> StagePolicy {
        self.policies
            .get(&stage)
            .copied()
            .unwrap_or(StagePolicy::FATAL)
    }

    pub fn is_fatal(&self, stage: StageId) -> bool {
        self.get(stage).fatal
    }
}
