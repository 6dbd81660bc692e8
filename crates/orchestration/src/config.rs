//! Target configuration consumed by commands
//!
//! [`AppConfig`] describes where resource files live and the names commands
//! need to address database-scoped resources. Per-command toggles and rank
//! overrides are carried here as plain data and applied when commands are
//! constructed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Worker count used when a command processes files asynchronously
pub const DEFAULT_ASYNC_THREAD_COUNT: usize = 16;

/// Target-environment configuration shared by every command in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppConfig {
    /// Application name, used to derive database names
    pub name: String,
    /// Base directory holding resource subdirectories
    pub config_dir: PathBuf,
    /// Content database name (defaults to `<name>-content`)
    pub content_database_name: Option<String>,
    /// Triggers database name (defaults to `<name>-triggers`)
    pub triggers_database_name: Option<String>,
    /// File names under `databases/` that define content databases
    pub content_database_files: Vec<String>,
    /// Per-command toggles, keyed by command name
    pub commands: BTreeMap<String, CommandOverrides>,
    /// Per-command rank overrides, keyed by command name
    pub ranks: BTreeMap<String, RankOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "my-app".to_string(),
            config_dir: PathBuf::from("src/main/ml-config"),
            content_database_name: None,
            triggers_database_name: None,
            content_database_files: vec!["content-database.json".to_string()],
            commands: BTreeMap::new(),
            ranks: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Create a config for an app rooted at `config_dir`
    pub fn new(name: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Directory layout rooted at the configured base directory
    pub fn config_dir(&self) -> ConfigDir {
        ConfigDir::new(&self.config_dir)
    }

    pub fn content_database_name(&self) -> String {
        self.content_database_name
            .clone()
            .unwrap_or_else(|| format!("{}-content", self.name))
    }

    pub fn triggers_database_name(&self) -> String {
        self.triggers_database_name
            .clone()
            .unwrap_or_else(|| format!("{}-triggers", self.name))
    }

    /// Paths of the content database definition files
    pub fn content_database_paths(&self) -> Vec<PathBuf> {
        let dir = self.config_dir().databases_dir();
        self.content_database_files
            .iter()
            .map(|f| dir.join(f))
            .collect()
    }

    /// Toggles configured for a command, if any
    pub fn command_overrides(&self, command: &str) -> Option<&CommandOverrides> {
        self.commands.get(command)
    }
}

/// Well-known subdirectories of the configuration base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    base_dir: PathBuf,
}

impl ConfigDir {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a path relative to the base directory (absolute paths pass through)
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }

    pub fn databases_dir(&self) -> PathBuf {
        self.resolve("databases")
    }
}

/// Behavior toggles for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSettings {
    /// Delete the command's resources during undo
    pub delete_resources_on_undo: bool,
    /// Route deletes through the restart coordinator
    pub restart_after_delete: bool,
    /// Log and swallow delete failures instead of aborting undo
    pub catch_exception_on_delete_failure: bool,
    /// Process files on a worker pool
    pub async_enabled: bool,
    /// Size of the worker pool when async is enabled
    pub async_thread_count: usize,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            delete_resources_on_undo: true,
            restart_after_delete: false,
            catch_exception_on_delete_failure: false,
            async_enabled: false,
            async_thread_count: DEFAULT_ASYNC_THREAD_COUNT,
        }
    }
}

impl CommandSettings {
    pub fn restart_after_delete(mut self, enabled: bool) -> Self {
        self.restart_after_delete = enabled;
        self
    }

    pub fn catch_exception_on_delete_failure(mut self, enabled: bool) -> Self {
        self.catch_exception_on_delete_failure = enabled;
        self
    }

    pub fn delete_resources_on_undo(mut self, enabled: bool) -> Self {
        self.delete_resources_on_undo = enabled;
        self
    }

    pub fn async_enabled(mut self, enabled: bool) -> Self {
        self.async_enabled = enabled;
        self
    }

    /// Enable async processing with the given worker count
    pub fn async_threads(mut self, count: usize) -> Self {
        self.async_enabled = true;
        self.async_thread_count = count;
        self
    }

    /// Apply configured overrides on top of these settings
    pub fn with_overrides(mut self, overrides: &CommandOverrides) -> Self {
        if let Some(v) = overrides.delete_resources_on_undo {
            self.delete_resources_on_undo = v;
        }
        if let Some(v) = overrides.restart_after_delete {
            self.restart_after_delete = v;
        }
        if let Some(v) = overrides.catch_exception_on_delete_failure {
            self.catch_exception_on_delete_failure = v;
        }
        if let Some(v) = overrides.async_enabled {
            self.async_enabled = v;
        }
        if let Some(v) = overrides.async_thread_count {
            self.async_thread_count = v;
        }
        self
    }

    /// Worker count actually used (never zero)
    pub fn effective_thread_count(&self) -> usize {
        self.async_thread_count.max(1)
    }
}

/// Per-command configuration surface; unset fields keep the command's defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CommandOverrides {
    pub delete_resources_on_undo: Option<bool>,
    pub restart_after_delete: Option<bool>,
    pub catch_exception_on_delete_failure: Option<bool>,
    pub async_enabled: Option<bool>,
    pub async_thread_count: Option<usize>,
    /// Replace the command's resource path(s), relative to the config dir
    pub path: Option<PathBuf>,
}

/// Rank override for one command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankOverride {
    pub execute: Option<i32>,
    pub undo: Option<i32>,
}
