// error.rs: Error types for the proposal lifecycle.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The proposal cannot move from its current state to the requested one.
    #[error("invalid transition from {from} to {to} for proposal {proposal_id}")]
    InvalidTransition {
        proposal_id: Uuid,
        from: String,
        to: String,
    },

    /// Approve/reject was applied to a proposal that is not awaiting a decision.
    #[error("proposal {proposal_id} is {state}, not pending_approval")]
    NotPending { proposal_id: Uuid, state: String },

    /// The approval collaborator could not accept the proposal (non-fatal).
    #[error("approval gate error: {0}")]
    Gate(String),
}
