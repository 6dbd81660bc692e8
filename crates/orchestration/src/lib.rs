//! # Orchestration
//!
//! An engine for deploying and undeploying declarative resource definitions
//! against a remote management API.
//!
//! A configuration directory holds one subdirectory per resource category
//! (users, roles, databases, app servers, ...). Each category is owned by a
//! [`ResourceCommand`]. The [`CommandOrchestrator`] runs commands in a single
//! global order: ascending execute rank on deploy, descending undo rank on
//! undo.
//!
//! ## Core Concepts
//!
//! - **ResourceCommand**: one category of resource files, with its ranks
//! - **FileResourceCommand**: a command defined by layout, kind and toggles
//! - **CommandContext**: configuration, API client and restart coordinator
//! - **ParallelFileProcessor**: per-command worker pool with a drain barrier
//! - **RestartCoordinator**: blocks until the server restarted after a call
//!
//! ## Example
//!
//! ```ignore
//! use orchestration::{
//!     AppConfig, CommandContext, CommandOrchestrator, NoRestart, RestartCoordinator,
//! };
//! use std::sync::Arc;
//!
//! let config = AppConfig::new("my-app", "src/main/ml-config");
//! let restart = RestartCoordinator::new(Arc::new(NoRestart::default()));
//! let ctx = CommandContext::new(config, api, restart);
//!
//! let orchestrator = CommandOrchestrator::standard(&ctx);
//! let report = orchestrator.deploy_simple(&ctx)?;
//! println!("{} command(s) ran", report.commands.len());
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`ManagementApi`] / [`ResourceManager`]: create, update and delete resources
//! - [`RestartProbe`]: reports the server's restart marker
//! - [`PhaseObserver`]: receives per-command progress
//!
//! This allows the crate to be used without a hard dependency on a specific
//! HTTP client or UI.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod pool;
pub mod registry;
pub mod restart;
pub mod scanner;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use command::{
    AfterSave, BoxedCommand, FileEffect, FileResourceCommand, ResourceCommand, ResourceDir,
    ResourceLayout, delete_file, process_resource_dirs, save_file,
};
pub use config::{AppConfig, CommandOverrides, CommandSettings, ConfigDir, RankOverride};
pub use context::{CommandContext, ManagementApi, NoObserver, PhaseObserver, ResourceManager};
pub use error::{Error, Phase, Result};
pub use orchestrator::CommandOrchestrator;
pub use plan::{CommandPlan, PhasePlan, PlannedDir};
pub use pool::{DrainReport, ParallelFileProcessor};
pub use registry::{RankTable, standard_commands};
pub use restart::{NoRestart, RestartCoordinator, RestartProbe};
pub use scanner::{ExcludeFilenames, FileFilter, IncludeFilenames, ResourceFileScanner};
pub use types::{
    CommandSummary, DeleteOutcome, PhaseReport, ResourceFile, ResourceKind, SaveReceipt,
};
