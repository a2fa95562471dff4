//! # Shipyard
//!
//! Deploys a project made of a serverless backend, declaratively provisioned
//! infrastructure and a static frontend behind a CDN, one environment at a time.
//!
//! ## Usage
//!
//! ```bash
//! shipyard [ENVIRONMENT] [DESTROY] [--config PATH] [--project-dir PATH] [-v...]
//! ```
//!
//! ## Modules
//!
//! - `cli` - Argument parsing and the binary's entry point
//! - `config` - `shipyard.toml` loading and startup validation
//! - `deploy` - Stage policy table, stage runner and the stages themselves
//! - `error` - Coded error type and exit-code mapping
//! - `subprocess` - Process runner abstraction, mock runner and tool wrappers
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod subprocess;
