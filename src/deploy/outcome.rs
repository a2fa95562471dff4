use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use super::environment::Environment;
use super::outputs::InfraOutputs;
use super::policy::StageId;
use crate::error::DeployError;

/// Result of a single stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    Skipped(String),
    /// Fatal failure that ended the run
    Failed {
        error: String,
        exit_code: i32,
    },
    /// Failure the policy table allowed the run to continue past
    Tolerated(String),
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Succeeded => "ok",
            StageStatus::Skipped(_) => "skipped",
            StageStatus::Failed { .. } => "FAILED",
            StageStatus::Tolerated(_) => "failed (tolerated)",
        }
    }

    /// Whether the stage actually ran its commands
    pub fn executed(&self) -> bool {
        !matches!(self, StageStatus::Skipped(_))
    }
}

#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: StageId,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

/// What happened to the remote-state backend definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStatus {
    /// Not reached yet (the run stopped before the bootstrap stage)
    NotRun,
    Applied,
    AbsentSkipped,
    Failed,
}

impl fmt::Display for BootstrapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BootstrapStatus::NotRun => "not run",
            BootstrapStatus::Applied => "present and applied",
            BootstrapStatus::AbsentSkipped => "absent, existing backend assumed",
            BootstrapStatus::Failed => "present but failed",
        };
        f.write_str(text)
    }
}

/// Ordered record of one invocation. Lives only as long as the run.
#[derive(Debug)]
pub struct RunOutcome {
    pub environment: Environment,
    pub destroy_requested: bool,
    pub records: Vec<StageRecord>,
    pub bootstrap: BootstrapStatus,
    pub outputs: Option<InfraOutputs>,
    pub error: Option<DeployError>,
}

impl RunOutcome {
    pub fn new(environment: Environment, destroy_requested: bool) -> Self {
        Self {
            environment,
            destroy_requested,
            records: Vec::new(),
            bootstrap: BootstrapStatus::NotRun,
            outputs: None,
            error: None,
        }
    }

    pub fn record(
        &mut self,
        stage: StageId,
        status: StageStatus,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) {
        self.records.push(StageRecord {
            stage,
            status,
            started_at,
            duration,
        });
    }

    pub fn skip(&mut self, stage: StageId, reason: impl Into<String>) {
        self.record(stage, StageStatus::Skipped(reason.into()), Utc::now(), Duration::ZERO);
    }

    pub fn status_of(&self, stage: StageId) -> Option<&StageStatus> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// Stages whose commands ran, in order
    pub fn executed_stages(&self) -> Vec<StageId> {
        self.records
            .iter()
            .filter(|r| r.status.executed())
            .map(|r| r.stage)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map_or(0, DeployError::exit_code)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run summary for '{}' (destroy: {})",
            self.environment, self.destroy_requested
        )?;
        for record in &self.records {
            write!(
                f,
                "  {:<20} {:<20} {:>8.1}s",
                record.stage.name(),
                record.status.label(),
                record.duration.as_secs_f64()
            )?;
            match &record.status {
                StageStatus::Skipped(reason) | StageStatus::Tolerated(reason) => {
                    write!(f, "  {}", reason)?
                }
                StageStatus::Failed { error, .. } => write!(f, "  {}", error)?,
                StageStatus::Succeeded => {}
            }
            writeln!(f)?;
        }
        writeln!(f, "  backend bootstrap: {}", self.bootstrap)?;
        match &self.error {
            None => write!(f, "Result: success"),
            Some(err) => write!(
                f,
                "Result: failed (exit code {}): {}",
                err.exit_code(),
                err.code_summary()
            ),
        }
    }
}
