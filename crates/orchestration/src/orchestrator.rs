//! Orchestration engine - runs registered commands in rank order

use crate::command::{BoxedCommand, ResourceCommand};
use crate::context::{CommandContext, NoObserver, PhaseObserver};
use crate::error::{Error, Phase, Result};
use crate::plan::{PhasePlan, plan_command};
use crate::registry::{RankTable, standard_commands};
use crate::types::PhaseReport;
use std::collections::BTreeSet;

/// Owns the command registry and runs it as a deploy or undo phase
///
/// Commands run one at a time. A failing command aborts the phase; commands
/// that already ran are not rolled back.
pub struct CommandOrchestrator {
    commands: Vec<BoxedCommand>,
    ranks: RankTable,
    only: Option<BTreeSet<String>>,
}

impl CommandOrchestrator {
    pub fn new(ranks: RankTable) -> Self {
        Self {
            commands: Vec::new(),
            ranks,
            only: None,
        }
    }

    /// Orchestrator holding the standard commands, ranked per `ctx`'s config
    pub fn standard(ctx: &CommandContext) -> Self {
        let config = ctx.app_config();
        let mut orchestrator = Self::new(RankTable::from_config(config));
        for command in standard_commands(config) {
            orchestrator.register_boxed(command);
        }
        orchestrator
    }

    /// Add a command; ties in rank keep registration order
    pub fn register(&mut self, command: impl ResourceCommand + 'static) -> &mut Self {
        self.register_boxed(Box::new(command))
    }

    pub fn register_boxed(&mut self, command: BoxedCommand) -> &mut Self {
        log::debug!("Registered command {}", command.name());
        self.commands.push(command);
        self
    }

    /// Restrict both phases to the named commands
    ///
    /// Relative order is unchanged. Unknown names are rejected.
    pub fn restrict_to<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let unknown: Vec<&str> = names
            .iter()
            .filter(|n| !self.commands.iter().any(|c| c.name() == n.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(Error::Config(format!(
                "unknown command(s): {}",
                unknown.join(", ")
            )));
        }
        self.only = Some(names);
        Ok(())
    }

    /// Registered command names, in registration order
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn rank(&self, phase: Phase, command: &dyn ResourceCommand) -> i32 {
        match phase {
            Phase::Deploy => self.ranks.execute_rank(command),
            Phase::Undo => self.ranks.undo_rank(command),
        }
    }

    /// Selected commands in the order `phase` runs them, with their ranks
    ///
    /// Deploy is ascending by execute rank, undo descending by undo rank.
    /// Both sorts are stable.
    pub fn ordered(&self, phase: Phase) -> Vec<(&dyn ResourceCommand, i32)> {
        let mut ordered: Vec<(&dyn ResourceCommand, i32)> = self
            .commands
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| self.is_selected(c.name()))
            .map(|c| (c, self.rank(phase, c)))
            .collect();
        match phase {
            Phase::Deploy => ordered.sort_by_key(|(_, rank)| *rank),
            Phase::Undo => ordered.sort_by_key(|(_, rank)| std::cmp::Reverse(*rank)),
        }
        ordered
    }

    fn is_selected(&self, name: &str) -> bool {
        self.only.as_ref().is_none_or(|only| only.contains(name))
    }

    /// Run every selected command's `execute`, ascending by execute rank
    pub fn deploy<O: PhaseObserver>(
        &self,
        ctx: &CommandContext,
        observer: &mut O,
    ) -> Result<PhaseReport> {
        self.run_phase(Phase::Deploy, ctx, observer)
    }

    /// Run every selected command's `undo`, descending by undo rank
    pub fn undo<O: PhaseObserver>(
        &self,
        ctx: &CommandContext,
        observer: &mut O,
    ) -> Result<PhaseReport> {
        self.run_phase(Phase::Undo, ctx, observer)
    }

    /// Deploy without progress callbacks
    pub fn deploy_simple(&self, ctx: &CommandContext) -> Result<PhaseReport> {
        self.deploy(ctx, &mut NoObserver)
    }

    /// Undo without progress callbacks
    pub fn undo_simple(&self, ctx: &CommandContext) -> Result<PhaseReport> {
        self.undo(ctx, &mut NoObserver)
    }

    fn run_phase<O: PhaseObserver>(
        &self,
        phase: Phase,
        ctx: &CommandContext,
        observer: &mut O,
    ) -> Result<PhaseReport> {
        let mut report = PhaseReport::default();

        for (command, rank) in self.ordered(phase) {
            let name = command.name();
            log::info!("Running {phase} for command {name} with rank {rank}");
            observer.on_command_start(phase, name, rank);

            let result = match phase {
                Phase::Deploy => command.execute(ctx),
                Phase::Undo => command.undo(ctx),
            };
            let summary = result.map_err(|e| {
                log::error!("Command {name} failed during {phase}: {e}");
                Error::PhaseAborted {
                    phase,
                    command: name.to_string(),
                    completed: report
                        .command_names()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    source: Box::new(e),
                }
            })?;

            log::info!("Finished {phase} for command {name}");
            observer.on_command_complete(phase, name, &summary);
            report.commands.push((name.to_string(), summary));
        }

        Ok(report)
    }

    /// Preview what `phase` would touch, without calling the API
    pub fn plan(&self, phase: Phase, ctx: &CommandContext) -> Result<PhasePlan> {
        let commands = self
            .ordered(phase)
            .into_iter()
            .map(|(command, rank)| plan_command(phase, command, rank, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(PhasePlan { phase, commands })
    }
}

impl std::fmt::Debug for CommandOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandOrchestrator")
            .field("commands", &self.command_names())
            .field("ranks", &self.ranks)
            .field("only", &self.only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::restart::{NoRestart, RestartCoordinator};
    use crate::testing::{Call, FakeApi};
    use crate::types::{CommandSummary, ResourceKind};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Appends "<name>:<phase>" to a shared log
    struct Recording {
        name: &'static str,
        execute_rank: i32,
        undo_rank: i32,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Recording {
        fn new(name: &'static str, rank: i32, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                execute_rank: rank,
                undo_rank: rank,
                log: Arc::clone(log),
                fail: false,
            }
        }

        fn run(&self, phase: &str) -> Result<CommandSummary> {
            self.log.lock().unwrap().push(format!("{}:{phase}", self.name));
            if self.fail {
                Err(Error::transport("connection refused", None))
            } else {
                Ok(CommandSummary::default())
            }
        }
    }

    impl ResourceCommand for Recording {
        fn name(&self) -> &str {
            self.name
        }
        fn execute_rank(&self) -> i32 {
            self.execute_rank
        }
        fn undo_rank(&self) -> i32 {
            self.undo_rank
        }
        fn execute(&self, _ctx: &CommandContext) -> Result<CommandSummary> {
            self.run("deploy")
        }
        fn undo(&self, _ctx: &CommandContext) -> Result<CommandSummary> {
            self.run("undo")
        }
    }

    fn context(base: &std::path::Path) -> (CommandContext, Arc<FakeApi>) {
        let api = FakeApi::new();
        let restart = RestartCoordinator::new(Arc::new(NoRestart::default()));
        let ctx = CommandContext::new(AppConfig::new("sample", base), api.clone(), restart);
        (ctx, api)
    }

    fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_lower_rank_executes_first() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut orchestrator = CommandOrchestrator::new(RankTable::new());
        orchestrator
            .register(Recording::new("ten", 10, &log))
            .register(Recording::new("five", 5, &log));

        let report = orchestrator.deploy_simple(&ctx).unwrap();
        assert_eq!(entries(&log), ["five:deploy", "ten:deploy"]);
        assert_eq!(report.command_names(), ["five", "ten"]);
    }

    #[test]
    fn test_ties_keep_registration_order_and_undo_reverses_rank() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut orchestrator = CommandOrchestrator::new(RankTable::new());
        orchestrator
            .register(Recording::new("b", 20, &log))
            .register(Recording::new("a1", 10, &log))
            .register(Recording::new("a2", 10, &log))
            .register(Recording::new("c", 30, &log));

        orchestrator.deploy_simple(&ctx).unwrap();
        assert_eq!(
            entries(&log),
            ["a1:deploy", "a2:deploy", "b:deploy", "c:deploy"]
        );

        orchestrator.undo_simple(&ctx).unwrap();
        assert_eq!(entries(&log), ["c:undo", "b:undo", "a1:undo", "a2:undo"]);
    }

    #[test]
    fn test_rank_table_overrides_declared_rank() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut ranks = RankTable::new();
        ranks.set("late", 1, 1);
        let mut orchestrator = CommandOrchestrator::new(ranks);
        orchestrator
            .register(Recording::new("early", 5, &log))
            .register(Recording::new("late", 50, &log));

        orchestrator.deploy_simple(&ctx).unwrap();
        assert_eq!(entries(&log), ["late:deploy", "early:deploy"]);
    }

    #[test]
    fn test_failure_aborts_and_reports_completed_commands() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut failing = Recording::new("broken", 20, &log);
        failing.fail = true;
        let mut orchestrator = CommandOrchestrator::new(RankTable::new());
        orchestrator
            .register(Recording::new("first", 10, &log))
            .register(failing)
            .register(Recording::new("never", 30, &log));

        let err = orchestrator.deploy_simple(&ctx).unwrap_err();
        assert_eq!(entries(&log), ["first:deploy", "broken:deploy"]);
        match &err {
            Error::PhaseAborted {
                phase,
                command,
                completed,
                ..
            } => {
                assert_eq!(*phase, Phase::Deploy);
                assert_eq!(command, "broken");
                assert_eq!(completed, &["first".to_string()]);
            }
            other => panic!("expected PhaseAborted, got {other:?}"),
        }
        assert!(err.is_transport());
    }

    #[test]
    fn test_restrict_to_keeps_order_and_rejects_unknown() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut orchestrator = CommandOrchestrator::new(RankTable::new());
        orchestrator
            .register(Recording::new("a", 1, &log))
            .register(Recording::new("b", 2, &log))
            .register(Recording::new("c", 3, &log));

        assert!(matches!(
            orchestrator.restrict_to(["a", "zzz"]),
            Err(Error::Config(_))
        ));
        orchestrator.restrict_to(["c", "a"]).unwrap();
        orchestrator.deploy_simple(&ctx).unwrap();
        assert_eq!(entries(&log), ["a:deploy", "c:deploy"]);
    }

    #[test]
    fn test_observer_sees_every_command() {
        #[derive(Default)]
        struct Events(Vec<String>);

        impl PhaseObserver for Events {
            fn on_command_start(&mut self, phase: Phase, name: &str, rank: i32) {
                self.0.push(format!("start {phase} {name} {rank}"));
            }
            fn on_command_complete(&mut self, phase: Phase, name: &str, _: &CommandSummary) {
                self.0.push(format!("done {phase} {name}"));
            }
        }

        let tmp = TempDir::new().unwrap();
        let (ctx, _) = context(tmp.path());
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut orchestrator = CommandOrchestrator::new(RankTable::new());
        orchestrator.register(Recording::new("only", 7, &log));

        let mut events = Events::default();
        orchestrator.undo(&ctx, &mut events).unwrap();
        assert_eq!(events.0, ["start undo only 7", "done undo only"]);
    }

    #[test]
    fn test_standard_deploy_and_undo_against_config_tree() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        for (dir, file, body) in [
            ("security/roles", "r.json", r#"{"role-name":"r"}"#),
            ("security/users", "u.json", r#"{"user-name":"u"}"#),
            ("databases", "content-database.json", r#"{"database-name":"c"}"#),
            ("databases", "extra-database.json", r#"{"database-name":"x"}"#),
            ("servers", "http.json", r#"{"server-name":"http"}"#),
        ] {
            fs::create_dir_all(base.join(dir)).unwrap();
            fs::write(base.join(dir).join(file), body).unwrap();
        }
        let (ctx, api) = context(base);
        let orchestrator = CommandOrchestrator::standard(&ctx);

        let report = orchestrator.deploy_simple(&ctx).unwrap();
        assert_eq!(report.commands.len(), orchestrator.command_names().len());
        let kinds: Vec<ResourceKind> = api.journal().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            [
                ResourceKind::Role,
                ResourceKind::User,
                ResourceKind::Database,
                ResourceKind::Database,
                ResourceKind::AppServer,
            ]
        );

        orchestrator.undo_simple(&ctx).unwrap();
        let undo: Vec<(ResourceKind, Call)> = api.journal().into_iter().skip(5).collect();
        assert_eq!(
            undo,
            [
                (
                    ResourceKind::AppServer,
                    Call::Delete(r#"{"server-name":"http"}"#.into())
                ),
                (
                    ResourceKind::Database,
                    Call::Delete(r#"{"database-name":"c"}"#.into())
                ),
                (
                    ResourceKind::User,
                    Call::Delete(r#"{"user-name":"u"}"#.into())
                ),
                (
                    ResourceKind::Role,
                    Call::Delete(r#"{"role-name":"r"}"#.into())
                ),
            ]
        );
    }
}
