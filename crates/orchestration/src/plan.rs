//! Read-only previews of a phase
//!
//! A plan lists, in run order, each command with the directories and files it
//! would process. Nothing is sent to the management API.

use crate::command::ResourceCommand;
use crate::context::CommandContext;
use crate::error::{Phase, Result};
use crate::scanner::ResourceFileScanner;
use serde::Serialize;
use std::path::PathBuf;

/// One resource directory of a planned command
#[derive(Debug, Clone, Serialize)]
pub struct PlannedDir {
    pub path: PathBuf,
    /// Resource kind, as displayed
    pub kind: String,
    pub exists: bool,
    pub files: Vec<PathBuf>,
}

/// What one command would do
#[derive(Debug, Clone, Serialize)]
pub struct CommandPlan {
    pub name: String,
    pub rank: i32,
    /// False when the command has nothing to do in this phase (e.g. an undo
    /// for a command that does not delete)
    pub active: bool,
    pub dirs: Vec<PlannedDir>,
}

impl CommandPlan {
    pub fn file_count(&self) -> usize {
        self.dirs.iter().map(|d| d.files.len()).sum()
    }

    /// Whether the command would make any API call
    pub fn has_work(&self) -> bool {
        self.active && self.file_count() > 0
    }
}

/// Ordered preview of a whole phase
#[derive(Debug, Clone, Serialize)]
pub struct PhasePlan {
    pub phase: Phase,
    pub commands: Vec<CommandPlan>,
}

impl PhasePlan {
    pub fn total_files(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| c.active)
            .map(CommandPlan::file_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        !self.commands.iter().any(CommandPlan::has_work)
    }

    /// Commands that would make API calls, in run order
    pub fn with_work(&self) -> impl Iterator<Item = &CommandPlan> {
        self.commands.iter().filter(|c| c.has_work())
    }
}

/// Build the plan entry for one command
pub fn plan_command(
    phase: Phase,
    command: &dyn ResourceCommand,
    rank: i32,
    ctx: &CommandContext,
) -> Result<CommandPlan> {
    let active = match phase {
        Phase::Deploy => true,
        Phase::Undo => command.deletes_on_undo(),
    };

    let mut dirs = Vec::new();
    for dir in command.resource_dirs(ctx)? {
        let exists = dir.path.is_dir();
        let files = ResourceFileScanner.list_paths(&dir.path, command.file_filter())?;
        dirs.push(PlannedDir {
            path: dir.path,
            kind: dir.kind.to_string(),
            exists,
            files,
        });
    }

    Ok(CommandPlan {
        name: command.name().to_string(),
        rank,
        active,
        dirs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::orchestrator::CommandOrchestrator;
    use crate::restart::{NoRestart, RestartCoordinator};
    use crate::testing::FakeApi;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(base: &std::path::Path) -> (CommandContext, Arc<FakeApi>) {
        let api = FakeApi::new();
        let restart = RestartCoordinator::new(Arc::new(NoRestart::default()));
        (
            CommandContext::new(AppConfig::new("sample", base), api.clone(), restart),
            api,
        )
    }

    #[test]
    fn test_plan_lists_files_in_run_order_without_calls() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("security/users")).unwrap();
        fs::create_dir_all(base.join("servers")).unwrap();
        fs::write(base.join("security/users/b.json"), "{}").unwrap();
        fs::write(base.join("security/users/a.json"), "{}").unwrap();
        fs::write(base.join("servers/http.json"), "{}").unwrap();

        let (ctx, api) = context(base);
        let orchestrator = CommandOrchestrator::standard(&ctx);
        let plan = orchestrator.plan(Phase::Deploy, &ctx).unwrap();

        let names: Vec<&str> = plan.with_work().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["users", "app-servers"]);
        assert_eq!(plan.total_files(), 3);

        let users = plan.with_work().next().unwrap();
        assert_eq!(
            users.dirs[0].files,
            vec![
                base.join("security/users/a.json"),
                base.join("security/users/b.json")
            ]
        );
        assert_eq!(api.managers_requested(), 0);
    }

    #[test]
    fn test_undo_plan_marks_non_deleting_commands_inactive() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("forests/db")).unwrap();
        fs::write(base.join("forests/db/f.json"), "{}").unwrap();

        let (ctx, _) = context(base);
        let plan = CommandOrchestrator::standard(&ctx)
            .plan(Phase::Undo, &ctx)
            .unwrap();

        let forests = plan.commands.iter().find(|c| c.name == "forests").unwrap();
        assert!(!forests.active);
        assert_eq!(forests.file_count(), 1);
        assert!(plan.is_empty());
        assert_eq!(plan.total_files(), 0);
    }

    #[test]
    fn test_missing_directories_are_reported() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let plan = CommandOrchestrator::standard(&ctx)
            .plan(Phase::Deploy, &ctx)
            .unwrap();

        assert!(plan.is_empty());
        let groups = &plan.commands[0];
        assert_eq!(groups.name, "groups");
        assert!(!groups.dirs[0].exists);
    }
}
