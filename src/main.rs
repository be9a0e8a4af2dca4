use anyhow::Result;
use clap::{Parser, Subcommand};

use flowsync::cmd;

#[derive(Parser)]
#[command(name = "flowsync", version, about = "Sync Langflow flows from a git repository", long_about = None, disable_help_subcommand = true)]
struct Cli {
    /// Debug-level logging
    #[arg(long, short, global = true, env = "VERBOSE")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push the flow changes between two commits to Langflow
    Sync(cmd::sync::SyncCmd),
    /// Show the changes between two commits without syncing
    Changes(cmd::changes::ChangesCmd),
    /// Delete OpenWebUI pipelines whose flow no longer exists
    PrunePipelines(cmd::pipelines::PrunePipelinesCmd),
    /// Show or store default settings
    Config(cmd::config::ConfigCmd),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    flowsync::logging::init(cli.verbose);
    match cli.command {
        Commands::Sync(c) => cmd::sync::handle_sync(c),
        Commands::Changes(c) => cmd::changes::handle_changes(c),
        Commands::PrunePipelines(c) => cmd::pipelines::handle_prune_pipelines(c),
        Commands::Config(c) => cmd::config::handle_config(c),
    }
}
