//! Deployment pipeline for one environment.
//!
//! [`Orchestrator`] drives the stages listed in [`StageId`]; the remaining
//! modules hold the pieces each stage is made of.

pub mod environment;
pub mod frontend;
pub mod orchestrator;
pub mod outcome;
pub mod outputs;
pub mod package;
pub mod policy;
pub mod retry;

pub use environment::{destroy_requested, Environment};
pub use orchestrator::Orchestrator;
pub use outcome::{BootstrapStatus, RunOutcome, StageRecord, StageStatus};
pub use outputs::InfraOutputs;
pub use policy::{PolicyTable, StageId, StagePolicy};
pub use retry::RetryPolicy;
