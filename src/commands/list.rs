//! `appdeploy commands`

use super::Session;
use crate::Context;
use anyhow::Result;
use colored::Colorize;
use orchestration::Phase;

/// Print every registered command with its deploy and undo ranks, in deploy order
pub fn run(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx, &[])?;
    let orchestrator = &session.orchestrator;

    println!(
        "  {:<20} {:>8} {:>8}",
        "COMMAND".bold(),
        "DEPLOY".bold(),
        "UNDO".bold()
    );
    for (command, execute_rank) in orchestrator.ordered(Phase::Deploy) {
        let undo_rank = orchestrator.rank(Phase::Undo, command);
        let marker = if command.deletes_on_undo() {
            String::new()
        } else {
            " (kept on undo)".dimmed().to_string()
        };
        println!(
            "  {:<20} {:>8} {:>8}{marker}",
            command.name(),
            execute_rank,
            undo_rank
        );
    }
    Ok(())
}
