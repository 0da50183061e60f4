// proposals.rs: Proposal review subcommands: list, show, approve, reject.

use clap::Subcommand;
use fg_approval::{ApprovalDecision, Proposal};
use fg_gateway::FleetGovConfig;
use fg_store::Persistence;
use uuid::Uuid;

use super::Fleet;

#[derive(Subcommand)]
pub enum ProposalCommands {
    /// List proposals, newest first.
    List {
        /// Only proposals still awaiting a decision or execution.
        #[arg(long)]
        open: bool,
    },
    /// Show one proposal as JSON.
    Show { id: Uuid },
    /// Approve a pending proposal.
    Approve {
        id: Uuid,
        /// Reviewer name.
        #[arg(long, default_value = "reviewer")]
        by: String,
    },
    /// Reject a pending proposal.
    Reject {
        id: Uuid,
        #[arg(long)]
        reason: String,
        /// Reviewer name.
        #[arg(long, default_value = "reviewer")]
        by: String,
    },
}

pub async fn execute(cmd: &ProposalCommands, config: &FleetGovConfig) -> anyhow::Result<()> {
    let fleet = Fleet::open(config, false)?;

    match cmd {
        ProposalCommands::List { open } => {
            let proposals: Vec<Proposal> = fleet
                .store
                .list_proposals()
                .await?
                .into_iter()
                .filter(|p| !open || p.state.is_open())
                .collect();

            if proposals.is_empty() {
                println!("No proposals.");
                return Ok(());
            }

            println!(
                "{:<38} {:<30} {:<18} {:<24} TARGET",
                "ID", "TOOL", "STATE", "CREATED"
            );
            println!("{}", "-".repeat(130));
            for p in &proposals {
                println!(
                    "{:<38} {:<30} {:<18} {:<24} {}",
                    p.proposal_id,
                    p.tool,
                    p.state,
                    p.created_at.format("%Y-%m-%d %H:%M:%S"),
                    p.target,
                );
            }
        }

        ProposalCommands::Show { id } => {
            let proposal = fleet
                .store
                .proposal(*id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no proposal {}", id))?;
            println!("{}", serde_json::to_string_pretty(&proposal)?);
        }

        ProposalCommands::Approve { id, by } => {
            decide(&fleet, config, *id, ApprovalDecision::approve(by.as_str())).await?;
        }

        ProposalCommands::Reject { id, reason, by } => {
            decide(
                &fleet,
                config,
                *id,
                ApprovalDecision::reject(by.as_str(), reason.as_str()),
            )
            .await?;
        }
    }

    Ok(())
}

async fn decide(
    fleet: &Fleet,
    config: &FleetGovConfig,
    id: Uuid,
    decision: ApprovalDecision,
) -> anyhow::Result<Proposal> {
    let proposal = fleet.store.decide_proposal(id, decision).await?;
    fleet.save(config).await?;
    tracing::info!(proposal_id = %id, state = %proposal.state, "proposal decided");
    println!("Proposal {} is now {}.", id, proposal.state);
    Ok(proposal)
}
