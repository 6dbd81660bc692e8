//! Command context and collaborator traits
//!
//! These traits allow the orchestration crate to be used without
//! depending on a specific management-API client, UI, etc.

use crate::config::AppConfig;
use crate::error::{Phase, Result};
use crate::restart::RestartCoordinator;
use crate::types::{CommandSummary, DeleteOutcome, ResourceKind, SaveReceipt};
use std::sync::Arc;

/// Creates, updates and deletes resources of one kind
///
/// Payloads are raw file contents. A payload may hold a single resource or
/// an array of them; splitting arrays is the manager's job.
pub trait ResourceManager: Send + Sync {
    /// Create the resource, or update it if it already exists
    fn save(&self, payload: &str) -> Result<SaveReceipt>;

    /// Delete the resource identified by the payload
    fn delete(&self, payload: &str) -> Result<DeleteOutcome>;
}

/// Handle to the remote management API
///
/// Implementations must be safe to call from many worker threads at once.
pub trait ManagementApi: Send + Sync {
    /// Manager for one kind of resource
    fn resource_manager(&self, kind: &ResourceKind) -> Result<Arc<dyn ResourceManager>>;
}

/// Observer for orchestration progress
///
/// Implement this trait to receive per-command updates during a phase.
pub trait PhaseObserver {
    /// Called before a command runs
    fn on_command_start(&mut self, phase: Phase, name: &str, rank: i32);

    /// Called after a command completed successfully
    fn on_command_complete(&mut self, phase: Phase, name: &str, summary: &CommandSummary);
}

/// No-op observer
pub struct NoObserver;

impl PhaseObserver for NoObserver {
    fn on_command_start(&mut self, _phase: Phase, _name: &str, _rank: i32) {}
    fn on_command_complete(&mut self, _phase: Phase, _name: &str, _summary: &CommandSummary) {}
}

/// Everything a command needs during one run
///
/// Cloning is cheap; worker tasks hold their own clone.
#[derive(Clone)]
pub struct CommandContext {
    config: Arc<AppConfig>,
    api: Arc<dyn ManagementApi>,
    restart: Arc<RestartCoordinator>,
}

impl CommandContext {
    pub fn new(
        config: AppConfig,
        api: Arc<dyn ManagementApi>,
        restart: RestartCoordinator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            api,
            restart: Arc::new(restart),
        }
    }

    /// Target-environment configuration
    pub fn app_config(&self) -> &AppConfig {
        &self.config
    }

    /// Management API client
    pub fn api(&self) -> &dyn ManagementApi {
        self.api.as_ref()
    }

    /// Coordinator for restart-triggering calls
    pub fn restart(&self) -> &RestartCoordinator {
        &self.restart
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("config", &self.config)
            .field("restart", &self.restart)
            .finish_non_exhaustive()
    }
}
