// gate.rs: Hand-off of pending proposals to the human approval collaborator.
//
// The gate only announces that a proposal awaits a decision. Decisions come
// back through the store (see `ApprovalDecision`), so a gate failure never
// loses a proposal; callers log it and carry on.

use async_trait::async_trait;

use crate::error::ApprovalError;
use crate::proposal::Proposal;

#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Notify reviewers that `proposal` is pending approval.
    async fn submit(&self, proposal: &Proposal) -> Result<(), ApprovalError>;
}

/// Gate for local use: records the hand-off in the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingApprovalGate;

#[async_trait]
impl ApprovalGate for LoggingApprovalGate {
    async fn submit(&self, proposal: &Proposal) -> Result<(), ApprovalError> {
        tracing::info!(
            proposal_id = %proposal.proposal_id,
            tool = %proposal.tool,
            risk = %proposal.risk,
            target = %proposal.target,
            requested_by = %proposal.requested_by,
            "proposal awaiting approval: {}",
            proposal.summary
        );
        Ok(())
    }
}
