pub mod deploy;
pub mod list;
pub mod plan;
pub mod undeploy;

use crate::Context;
use crate::config::Settings;
use crate::paths;
use crate::ui;
use anyhow::{Context as AnyhowContext, Result};
use manage::{ErrorCategory, ManageClient};
use orchestration::{
    CommandContext, CommandOrchestrator, CommandSummary, Phase, PhaseObserver, PhaseReport,
    RestartCoordinator,
};
use std::sync::Arc;

/// Everything a phase needs: loaded settings, engine context and registry
pub struct Session {
    pub settings: Settings,
    pub context: CommandContext,
    pub orchestrator: CommandOrchestrator,
}

impl Session {
    /// Load the config file and wire the HTTP clients into an engine context
    ///
    /// No request is sent until a phase runs.
    pub fn open(ctx: &Context, only: &[String]) -> Result<Self> {
        let path = paths::config_file(ctx.config.as_deref())?;
        let settings = Settings::load(&path)?;
        log::info!("Loaded configuration from {}", path.display());

        let client = ManageClient::new(&settings.connection)
            .context("Invalid [connection] settings")?;
        let admin = ManageClient::admin(&settings.connection)
            .context("Invalid [connection] settings")?;

        let mut restart = RestartCoordinator::new(Arc::new(admin))
            .with_poll_interval(settings.restart.poll_interval());
        if let Some(deadline) = settings.restart.deadline() {
            restart = restart.with_deadline(deadline);
        }

        let context = CommandContext::new(settings.app_config(), Arc::new(client), restart);
        let mut orchestrator = CommandOrchestrator::standard(&context);
        if !only.is_empty() {
            orchestrator.restrict_to(only.iter().cloned())?;
        }

        Ok(Self {
            settings,
            context,
            orchestrator,
        })
    }
}

/// Prints one step line per command as a phase runs
pub struct ConsoleObserver {
    total: usize,
    current: usize,
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(total: usize, quiet: bool) -> Self {
        Self {
            total,
            current: 0,
            quiet,
        }
    }
}

impl PhaseObserver for ConsoleObserver {
    fn on_command_start(&mut self, _phase: Phase, name: &str, rank: i32) {
        self.current += 1;
        if !self.quiet {
            ui::step(self.current, self.total, &format!("{name} (rank {rank})"));
        }
    }

    fn on_command_complete(&mut self, phase: Phase, _name: &str, summary: &CommandSummary) {
        if !self.quiet && summary.files > 0 {
            ui::dim(&describe(phase, summary));
        }
    }
}

/// One-line description of what a command did
pub fn describe(phase: Phase, summary: &CommandSummary) -> String {
    let mut parts = vec![ui::count(summary.files, "file")];
    match phase {
        Phase::Deploy => {
            parts.push(format!("{} created", summary.created));
            parts.push(format!("{} updated", summary.updated));
        }
        Phase::Undo => {
            parts.push(format!("{} deleted", summary.deleted));
            if summary.not_found > 0 {
                parts.push(format!("{} already gone", summary.not_found));
            }
        }
    }
    if summary.tolerated_failures > 0 {
        parts.push(format!("{} failed (ignored)", summary.tolerated_failures));
    }
    parts.join(", ")
}

/// Run a phase with console progress and print its outcome
pub fn run_phase(ctx: &Context, session: &Session, phase: Phase) -> Result<PhaseReport> {
    let total = session.orchestrator.ordered(phase).len();
    let mut observer = ConsoleObserver::new(total, ctx.quiet);

    let result = match phase {
        Phase::Deploy => session.orchestrator.deploy(&session.context, &mut observer),
        Phase::Undo => session.orchestrator.undo(&session.context, &mut observer),
    };

    match result {
        Ok(report) => {
            if !ctx.quiet {
                let total = report.total();
                println!();
                ui::success(&format!(
                    "{phase} finished: {} ran, {}",
                    ui::count(report.commands.len(), "command"),
                    describe(phase, &total)
                ));
            }
            Ok(report)
        }
        Err(err) => {
            let completed = err.completed_commands();
            if !completed.is_empty() {
                ui::warn(&format!("Completed before the failure: {}", completed.join(", ")));
            }
            ui::warn(&failure_hint(&err));
            Err(anyhow::Error::new(err).context(format!("{phase} failed")))
        }
    }
}

/// Category and advice for a failed phase
pub fn failure_hint(err: &orchestration::Error) -> String {
    let category = ErrorCategory::of(err);
    format!("{category}. {}", category.advice())
}
