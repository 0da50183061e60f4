//! # fg-cli
//!
//! Command-line interface for fleet governance.
//!
//! - `fg init`: create `.fleetgov/` with a config and a demo fleet
//! - `fg tools list/info`: browse the tool catalog and its safety metadata
//! - `fg exec <tool> [params]`: invoke a tool through the registry
//! - `fg proposals list/approve/reject`: review pending proposals
//! - `fg audit verify/tail`: inspect the invocation audit trail

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fg_gateway::FleetGovConfig;
use tracing_subscriber::EnvFilter;

/// Fleet governance: query, plan and propose changes under approval.
#[derive(Parser)]
#[command(name = "fg", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the state directory with a default config and a demo fleet.
    Init {
        /// Overwrite an existing config and snapshot.
        #[arg(long)]
        force: bool,
    },
    /// Browse the tool catalog.
    Tools {
        #[command(subcommand)]
        command: commands::tools::ToolsCommands,
    },
    /// Invoke a tool.
    Exec(commands::exec::ExecArgs),
    /// Review proposals awaiting approval.
    Proposals {
        #[command(subcommand)]
        command: commands::proposals::ProposalCommands,
    },
    /// Inspect the audit trail.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))?
        .add_directive("fg_gateway=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = FleetGovConfig::for_project(&project_root)?;
    tracing::debug!(project_root = %project_root.display(), "configuration loaded");

    match &cli.command {
        Commands::Init { force } => commands::init::execute(&project_root, &config, *force),
        Commands::Tools { command } => commands::tools::execute(command, &config),
        Commands::Exec(args) => commands::exec::execute(args, &config).await,
        Commands::Proposals { command } => commands::proposals::execute(command, &config).await,
        Commands::Audit { command } => commands::audit::execute(command, &config),
    }
}
