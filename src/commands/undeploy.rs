//! `appdeploy undeploy`

use super::{Session, run_phase};
use crate::Context;
use crate::cli::UndeployArgs;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use orchestration::Phase;

pub fn run(ctx: &Context, args: UndeployArgs) -> Result<()> {
    let session = Session::open(ctx, &args.only)?;
    let target = session.settings.connection.manage_base_url();

    if !ctx.quiet {
        ui::header(&format!("Undeploying {}", session.settings.app.name));
        ui::kv("server", &target);
        let plan = session.orchestrator.plan(Phase::Undo, &session.context)?;
        ui::kv(
            "resources",
            &format!(
                "{} across {}",
                ui::count(plan.total_files(), "file"),
                ui::count(plan.with_work().count(), "command")
            ),
        );
        println!();
    }

    if !args.yes && !confirm_undeploy(&target)? {
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    run_phase(ctx, &session, Phase::Undo)?;
    Ok(())
}

fn confirm_undeploy(target: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete these resources from {target}?"))
        .default(false)
        .interact()?;

    Ok(confirmed)
}
