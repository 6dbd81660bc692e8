//! `appdeploy deploy`

use super::{Session, run_phase};
use crate::Context;
use crate::cli::DeployArgs;
use crate::ui;
use anyhow::Result;
use orchestration::Phase;

pub fn run(ctx: &Context, args: DeployArgs) -> Result<()> {
    let session = Session::open(ctx, &args.only)?;

    if !ctx.quiet {
        ui::header(&format!("Deploying {}", session.settings.app.name));
        ui::kv("server", &session.settings.connection.manage_base_url());
        ui::kv("config dir", &session.settings.app.config_dir.display().to_string());
        println!();
    }

    run_phase(ctx, &session, Phase::Deploy)?;
    Ok(())
}
