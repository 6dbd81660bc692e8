//! `appdeploy plan`

use super::Session;
use crate::Context;
use crate::cli::PlanArgs;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use orchestration::{CommandPlan, Phase, PhasePlan};

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let session = Session::open(ctx, &args.only)?;
    let phase = if args.undo { Phase::Undo } else { Phase::Deploy };
    let plan = session.orchestrator.plan(phase, &session.context)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    print_plan(&plan);
    Ok(())
}

fn print_plan(plan: &PhasePlan) {
    ui::header(&format!("{} plan", capitalize(&plan.phase.to_string())));

    if plan.is_empty() {
        ui::info("Nothing to do");
        return;
    }

    for (index, command) in plan.with_work().enumerate() {
        println!();
        println!(
            "{} {} {}",
            format!("{:>2}.", index + 1).blue(),
            command.name.bold(),
            format!("(rank {}, {})", command.rank, ui::count(command.file_count(), "file")).dimmed()
        );
        print_files(command);
    }

    let skipped: Vec<&str> = plan
        .commands
        .iter()
        .filter(|c| !c.has_work())
        .map(|c| c.name.as_str())
        .collect();
    if !skipped.is_empty() {
        println!();
        ui::dim(&format!("No work: {}", skipped.join(", ")));
    }

    println!();
    ui::info(&format!(
        "{} would be processed",
        ui::count(plan.total_files(), "file")
    ));
}

fn print_files(command: &CommandPlan) {
    for dir in &command.dirs {
        if dir.files.is_empty() {
            continue;
        }
        ui::kv(&dir.kind, &dir.path.display().to_string());
        for file in &dir.files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            println!("      {} {name}", "→".cyan());
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
