// tools.rs: Tool catalog subcommands: list, info.

use std::sync::Arc;

use clap::Subcommand;
use fg_gateway::FleetGovConfig;
use fg_store::MemoryStore;
use fg_tool::{RiskLevel, ToolInfo};

use super::build_registry;

#[derive(Subcommand)]
pub enum ToolsCommands {
    /// List registered tools with their safety metadata.
    List {
        /// Only tools at exactly this risk level (read_only, plan_only,
        /// state_change_nonprod, state_change_prod).
        #[arg(long)]
        risk: Option<RiskLevel>,
    },
    /// Show one tool's descriptor and parameter schema as JSON.
    Info {
        /// Tool name.
        name: String,
    },
}

fn catalog(config: &FleetGovConfig) -> anyhow::Result<Vec<ToolInfo>> {
    // Describing tools never touches the store, so an empty one will do.
    let registry = build_registry(config, Arc::new(MemoryStore::empty()), false)?;
    Ok(registry.tool_info())
}

pub fn execute(cmd: &ToolsCommands, config: &FleetGovConfig) -> anyhow::Result<()> {
    match cmd {
        ToolsCommands::List { risk } => {
            let tools: Vec<ToolInfo> = catalog(config)?
                .into_iter()
                .filter(|t| risk.map_or(true, |r| t.risk == r))
                .collect();

            if tools.is_empty() {
                println!("No tools registered.");
                return Ok(());
            }

            println!(
                "{:<30} {:<22} {:<14} {:<10} IDEMPOTENT",
                "NAME", "RISK", "SCOPE", "APPROVAL"
            );
            println!("{}", "-".repeat(90));
            for t in &tools {
                println!(
                    "{:<30} {:<22} {:<14} {:<10} {}",
                    t.name,
                    t.risk.as_str(),
                    t.scope.as_str(),
                    if t.requires_approval { "required" } else { "-" },
                    if t.idempotent { "yes" } else { "no" },
                );
            }
            println!();
            println!("{} tool(s)", tools.len());
        }

        ToolsCommands::Info { name } => {
            let info = catalog(config)?
                .into_iter()
                .find(|t| &t.name == name)
                .ok_or_else(|| anyhow::anyhow!("no tool named '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_config;
    use tempfile::tempdir;

    #[test]
    fn catalog_lists_every_tool_without_touching_disk() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let tools = catalog(&config).unwrap();
        assert_eq!(tools.len(), 14);
        assert!(!config.paths.audit_log.exists());
        assert!(!config.paths.snapshot.exists());
    }

    #[test]
    fn unknown_tool_info_is_an_error() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let cmd = ToolsCommands::Info {
            name: "nope".to_string(),
        };
        assert!(execute(&cmd, &config).is_err());
    }
}
