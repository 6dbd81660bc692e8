use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appdeploy")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deploy application resources to a server management API", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./appdeploy.toml)
    #[arg(short, long, global = true, env = "APPDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update every resource, lowest rank first
    Deploy(DeployArgs),

    /// Delete deployed resources, highest rank first
    Undeploy(UndeployArgs),

    /// Show what deploy or undeploy would touch, without calling the server
    Plan(PlanArgs),

    /// List registered commands with their ranks
    Commands,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct DeployArgs {
    /// Only run these commands (comma-separated), e.g. users,roles
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

#[derive(Parser)]
pub struct UndeployArgs {
    /// Only run these commands (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Preview undeploy instead of deploy
    #[arg(long)]
    pub undo: bool,

    /// Only include these commands (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}
