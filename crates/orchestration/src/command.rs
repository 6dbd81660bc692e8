//! Resource commands
//!
//! A command is the unit of orchestration: it owns one category of resource
//! files, declares where it sits in the deploy and undo order, and knows how
//! to push its files to the management API and how to remove them again.
//!
//! Most commands differ only in configuration (directories, kind, ranks,
//! toggles), so [`FileResourceCommand`] covers them with a definition struct.
//! The shared per-file logic lives in [`process_resource_dirs`], which takes
//! the per-file work as a parameter.

use crate::config::{CommandOverrides, CommandSettings, ConfigDir};
use crate::context::{CommandContext, ResourceManager};
use crate::error::{Error, Result};
use crate::pool::ParallelFileProcessor;
use crate::scanner::{FileFilter, ResourceFileScanner, read_resource_file};
use crate::types::{CommandSummary, DeleteOutcome, ResourceFile, ResourceKind, SaveReceipt};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Core trait for orchestrated commands
///
/// # Example
///
/// ```ignore
/// use orchestration::{CommandContext, CommandSummary, ResourceCommand, Result};
///
/// struct Ping;
///
/// impl ResourceCommand for Ping {
///     fn name(&self) -> &str { "ping" }
///     fn execute_rank(&self) -> i32 { 1 }
///     fn undo_rank(&self) -> i32 { 1 }
///
///     fn execute(&self, _ctx: &CommandContext) -> Result<CommandSummary> {
///         log::info!("pong");
///         Ok(CommandSummary::default())
///     }
/// }
/// ```
pub trait ResourceCommand: Send + Sync {
    /// Stable name, used for configuration keys and `--only` filters
    fn name(&self) -> &str;

    /// Position in the deploy order (ascending)
    fn execute_rank(&self) -> i32;

    /// Position in the undo order (descending)
    fn undo_rank(&self) -> i32;

    /// Create or update this command's resources
    ///
    /// Must not return before all of its work has finished, even when the
    /// work runs on a worker pool.
    fn execute(&self, ctx: &CommandContext) -> Result<CommandSummary>;

    /// Remove this command's resources
    fn undo(&self, _ctx: &CommandContext) -> Result<CommandSummary> {
        Ok(CommandSummary::default())
    }

    /// Directories this command reads, for previews
    fn resource_dirs(&self, _ctx: &CommandContext) -> Result<Vec<ResourceDir>> {
        Ok(Vec::new())
    }

    /// Per-command filter applied on top of the default file filter
    fn file_filter(&self) -> Option<&dyn FileFilter> {
        None
    }

    /// Whether undo deletes anything
    fn deletes_on_undo(&self) -> bool {
        false
    }
}

/// A boxed command for type-erased storage
pub type BoxedCommand = Box<dyn ResourceCommand>;

/// One directory of resource files and the kind of resource it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDir {
    pub path: PathBuf,
    pub kind: ResourceKind,
}

impl ResourceDir {
    pub fn new(path: impl Into<PathBuf>, kind: ResourceKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Maps a subdirectory name to the resource kind of its files
pub type KindForSubdirectory = Arc<dyn Fn(&str) -> ResourceKind + Send + Sync>;

/// Where a command finds its files, relative to the configuration base dir
#[derive(Clone)]
pub enum ResourceLayout {
    /// Fixed directories, all holding the same kind
    Directories {
        paths: Vec<PathBuf>,
        kind: ResourceKind,
    },
    /// Every immediate subdirectory of `root` is a resource directory
    ///
    /// Subdirectory names are free-form (e.g. one per database for custom
    /// forests) and can select the kind (e.g. the flexrep config that owns a
    /// set of targets).
    Subdirectories {
        root: PathBuf,
        kind: KindForSubdirectory,
    },
}

impl ResourceLayout {
    /// A single directory of one kind
    pub fn directory(path: impl Into<PathBuf>, kind: ResourceKind) -> Self {
        Self::Directories {
            paths: vec![path.into()],
            kind,
        }
    }

    /// Subdirectories of `root` whose files all have the same kind
    pub fn subdirectories_of(root: impl Into<PathBuf>, kind: ResourceKind) -> Self {
        Self::Subdirectories {
            root: root.into(),
            kind: Arc::new(move |_| kind.clone()),
        }
    }

    /// Replace the configured path(s) with `path`
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match self {
            Self::Directories { kind, .. } => Self::Directories {
                paths: vec![path],
                kind,
            },
            Self::Subdirectories { kind, .. } => Self::Subdirectories { root: path, kind },
        }
    }

    /// Resolve to concrete directories under the config dir
    ///
    /// Directories that do not exist are kept; they are skipped at processing
    /// time.
    pub fn resolve(&self, config_dir: &ConfigDir) -> Result<Vec<ResourceDir>> {
        match self {
            Self::Directories { paths, kind } => Ok(paths
                .iter()
                .map(|p| ResourceDir::new(config_dir.resolve(p), kind.clone()))
                .collect()),
            Self::Subdirectories { root, kind } => {
                let subdirs = ResourceFileScanner.list_subdirectories(&config_dir.resolve(root))?;
                Ok(subdirs
                    .into_iter()
                    .map(|dir| {
                        let name = dir
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        ResourceDir::new(dir, kind(&name))
                    })
                    .collect())
            }
        }
    }
}

impl fmt::Debug for ResourceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directories { paths, kind } => f
                .debug_struct("Directories")
                .field("paths", paths)
                .field("kind", kind)
                .finish(),
            Self::Subdirectories { root, .. } => f
                .debug_struct("Subdirectories")
                .field("root", root)
                .finish_non_exhaustive(),
        }
    }
}

/// Hook run after each successful save
pub trait AfterSave: Send + Sync {
    fn after_resource_saved(
        &self,
        manager: &dyn ResourceManager,
        ctx: &CommandContext,
        file: &ResourceFile,
        receipt: &SaveReceipt,
    ) -> Result<()>;
}

/// What processing one file did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEffect {
    Saved(SaveReceipt),
    Deleted(DeleteOutcome),
    /// The delete failed and the failure was logged and swallowed
    DeleteFailureTolerated,
}

impl FileEffect {
    fn record(&self, summary: &mut CommandSummary) {
        match self {
            Self::Saved(receipt) => summary.add_receipt(receipt),
            Self::Deleted(outcome) => summary.add_outcome(outcome),
            Self::DeleteFailureTolerated => summary.add_tolerated_failure(),
        }
    }
}

fn record(summary: &Mutex<CommandSummary>, effect: &FileEffect) {
    match summary.lock() {
        Ok(mut locked) => effect.record(&mut locked),
        Err(poisoned) => effect.record(&mut poisoned.into_inner()),
    }
}

/// Run `work` on every eligible file of every directory
///
/// Directories that do not exist are skipped. With async enabled, each file
/// becomes one task on a pool created for this call, and the pool is drained
/// before returning even if listing a later directory failed.
pub fn process_resource_dirs<W>(
    ctx: &CommandContext,
    dirs: &[ResourceDir],
    filter: Option<&dyn FileFilter>,
    settings: &CommandSettings,
    work: W,
) -> Result<CommandSummary>
where
    W: Fn(&CommandContext, &dyn ResourceManager, &ResourceFile) -> Result<FileEffect>
        + Send
        + Sync
        + 'static,
{
    let summary = Arc::new(Mutex::new(CommandSummary::default()));
    let work = Arc::new(work);
    let mut processor = if settings.async_enabled {
        Some(ParallelFileProcessor::new(settings.effective_thread_count())?)
    } else {
        None
    };

    let submitted = (|| -> Result<()> {
        for dir in dirs {
            if !dir.path.is_dir() {
                log::debug!("Skipping missing directory: {}", dir.path.display());
                continue;
            }
            log::info!("Processing files in directory: {}", dir.path.display());
            let manager = ctx.api().resource_manager(&dir.kind)?;

            for path in ResourceFileScanner.list_paths(&dir.path, filter)? {
                match processor.as_mut() {
                    Some(processor) => {
                        let ctx = ctx.clone();
                        let manager = Arc::clone(&manager);
                        let work = Arc::clone(&work);
                        let summary = Arc::clone(&summary);
                        let label = path.display().to_string();
                        processor.submit(label, move || {
                            let file = read_resource_file(path)?;
                            log::info!("Processing file: {}", file.path.display());
                            let effect = work(&ctx, manager.as_ref(), &file)?;
                            record(&summary, &effect);
                            Ok(())
                        });
                    }
                    None => {
                        let file = read_resource_file(path)?;
                        log::info!("Processing file: {}", file.path.display());
                        let effect = work(ctx, manager.as_ref(), &file)?;
                        record(&summary, &effect);
                    }
                }
            }
        }
        Ok(())
    })();

    let drained = processor.map(ParallelFileProcessor::drain);
    submitted?;
    drained.transpose()?;

    let summary = match summary.lock() {
        Ok(locked) => locked.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    Ok(summary)
}

/// Save one file and run the after-save hook
pub fn save_file(
    ctx: &CommandContext,
    manager: &dyn ResourceManager,
    file: &ResourceFile,
    hook: Option<&dyn AfterSave>,
) -> Result<FileEffect> {
    let receipt = manager.save(&file.content)?;
    if let Some(hook) = hook {
        hook.after_resource_saved(manager, ctx, file, &receipt)?;
    }
    Ok(FileEffect::Saved(receipt))
}

/// Delete one file's resource, honoring the restart and tolerance toggles
///
/// When `catch_exception_on_delete_failure` is set, a failed delete is logged
/// and swallowed; if `restart_after_delete` is also set we still wait until
/// the restart marker read before the call changes, because a restart may
/// have started even though the call failed.
pub fn delete_file(
    ctx: &CommandContext,
    manager: &dyn ResourceManager,
    file: &ResourceFile,
    settings: &CommandSettings,
) -> Result<FileEffect> {
    let payload = file.content.as_str();
    let before = if settings.restart_after_delete {
        Some(ctx.restart().marker()?)
    } else {
        None
    };

    let attempt = match &before {
        Some(before) => {
            let mut outcome = None;
            ctx.restart()
                .invoke_action_since(before, || {
                    let result = manager.delete(payload)?;
                    let deleted = result.deleted;
                    outcome = Some(result);
                    Ok(deleted)
                })
                .map(|_| outcome.unwrap_or_else(|| DeleteOutcome::not_found(String::new())))
        }
        None => manager.delete(payload),
    };

    match attempt {
        Ok(outcome) => Ok(FileEffect::Deleted(outcome)),
        Err(e @ Error::RestartTimeout { .. }) => Err(e),
        Err(e) if settings.catch_exception_on_delete_failure => {
            log::warn!(
                "Caught error while trying to delete resource from {}; cause: {e}",
                file.path.display()
            );
            if let Some(before) = &before {
                ctx.restart().wait_for_restart_since(before)?;
            }
            Ok(FileEffect::DeleteFailureTolerated)
        }
        Err(e) => Err(e),
    }
}

/// A command defined entirely by configuration
pub struct FileResourceCommand {
    name: String,
    execute_rank: i32,
    undo_rank: i32,
    layout: ResourceLayout,
    settings: CommandSettings,
    filter: Option<Arc<dyn FileFilter>>,
    after_save: Option<Arc<dyn AfterSave>>,
}

impl FileResourceCommand {
    /// Create a command with default settings and both ranks set to 0
    pub fn new(name: impl Into<String>, layout: ResourceLayout) -> Self {
        Self {
            name: name.into(),
            execute_rank: 0,
            undo_rank: 0,
            layout,
            settings: CommandSettings::default(),
            filter: None,
            after_save: None,
        }
    }

    pub fn with_ranks(mut self, execute_rank: i32, undo_rank: i32) -> Self {
        self.execute_rank = execute_rank;
        self.undo_rank = undo_rank;
        self
    }

    pub fn with_settings(mut self, settings: CommandSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn FileFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_after_save(mut self, hook: Arc<dyn AfterSave>) -> Self {
        self.after_save = Some(hook);
        self
    }

    /// Apply configured toggles and path override
    pub fn with_overrides(mut self, overrides: &CommandOverrides) -> Self {
        self.settings = self.settings.with_overrides(overrides);
        if let Some(path) = &overrides.path {
            self.layout = self.layout.with_path(path.clone());
        }
        self
    }

    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    pub fn layout(&self) -> &ResourceLayout {
        &self.layout
    }
}

impl ResourceCommand for FileResourceCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute_rank(&self) -> i32 {
        self.execute_rank
    }

    fn undo_rank(&self) -> i32 {
        self.undo_rank
    }

    fn execute(&self, ctx: &CommandContext) -> Result<CommandSummary> {
        let dirs = self.resource_dirs(ctx)?;
        let hook = self.after_save.clone();
        process_resource_dirs(
            ctx,
            &dirs,
            self.filter.as_deref(),
            &self.settings,
            move |ctx, manager, file| save_file(ctx, manager, file, hook.as_deref()),
        )
    }

    fn undo(&self, ctx: &CommandContext) -> Result<CommandSummary> {
        if !self.settings.delete_resources_on_undo {
            log::debug!("Command {} does not delete resources on undo", self.name);
            return Ok(CommandSummary::default());
        }
        let dirs = self.resource_dirs(ctx)?;
        let settings = self.settings.clone();
        process_resource_dirs(
            ctx,
            &dirs,
            self.filter.as_deref(),
            &self.settings,
            move |ctx, manager, file| delete_file(ctx, manager, file, &settings),
        )
    }

    fn resource_dirs(&self, ctx: &CommandContext) -> Result<Vec<ResourceDir>> {
        self.layout.resolve(&ctx.app_config().config_dir())
    }

    fn file_filter(&self) -> Option<&dyn FileFilter> {
        self.filter.as_deref()
    }

    fn deletes_on_undo(&self) -> bool {
        self.settings.delete_resources_on_undo
    }
}

impl fmt::Debug for FileResourceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResourceCommand")
            .field("name", &self.name)
            .field("execute_rank", &self.execute_rank)
            .field("undo_rank", &self.undo_rank)
            .field("layout", &self.layout)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
