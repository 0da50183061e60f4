// proposal.rs: Proposal, the unit of human approval.
//
// Every invocation of an approval-requiring tool produces a Proposal instead
// of a direct effect. The state machine enforces:
//   Proposed → PendingApproval → Approved → Executing → Completed
//                              ↘ Rejected              ↘ Failed
// A failed proposal may go back to Executing only when its tool is
// idempotent; anything else needs a fresh proposal.

use std::fmt;

use chrono::{DateTime, Utc};
use fg_tool::{RiskLevel, Scope, Tool};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApprovalError;

/// Lifecycle state of a proposal.
///
/// Serializes as `{"state": "approved", "approved_by": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProposalState {
    /// Built but not yet handed to a reviewer.
    Proposed,

    /// Waiting on a human decision.
    PendingApproval,

    Approved { approved_by: String },

    Rejected { rejected_by: String, reason: String },

    /// The approved change is being applied.
    Executing,

    Completed,

    Failed { reason: String },
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalState::Proposed => write!(f, "proposed"),
            ProposalState::PendingApproval => write!(f, "pending_approval"),
            ProposalState::Approved { .. } => write!(f, "approved"),
            ProposalState::Rejected { .. } => write!(f, "rejected"),
            ProposalState::Executing => write!(f, "executing"),
            ProposalState::Completed => write!(f, "completed"),
            ProposalState::Failed { .. } => write!(f, "failed"),
        }
    }
}

impl ProposalState {
    /// Whether moving to `next` is allowed. `idempotent` describes the
    /// proposal's tool and only matters for retrying a failed execution.
    pub fn can_transition_to(&self, next: &ProposalState, idempotent: bool) -> bool {
        use ProposalState::*;
        match (self, next) {
            (Failed { .. }, Executing) => idempotent,
            _ => matches!(
                (self, next),
                (Proposed, PendingApproval)
                    | (PendingApproval, Approved { .. })
                    | (PendingApproval, Rejected { .. })
                    | (Approved { .. }, Executing)
                    | (Executing, Completed)
                    | (Executing, Failed { .. })
            ),
        }
    }

    /// No further transition is possible without a new proposal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalState::Completed | ProposalState::Rejected { .. })
    }

    /// Still in flight: awaiting a decision or on its way to completion.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ProposalState::Proposed
                | ProposalState::PendingApproval
                | ProposalState::Approved { .. }
                | ProposalState::Executing
        )
    }
}

/// A reviewer's decision on a pending proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve { by: String },
    Reject { by: String, reason: String },
}

impl ApprovalDecision {
    pub fn approve(by: impl Into<String>) -> Self {
        ApprovalDecision::Approve { by: by.into() }
    }

    pub fn reject(by: impl Into<String>, reason: impl Into<String>) -> Self {
        ApprovalDecision::Reject {
            by: by.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: Uuid,

    /// Name of the tool that produced this proposal.
    pub tool: String,
    pub risk: RiskLevel,
    pub scope: Scope,
    pub idempotent: bool,

    /// What the change acts on (asset id, environment, image family, ...).
    pub target: String,

    /// One-line description shown to reviewers.
    pub summary: String,

    /// Everything needed to execute the change once approved.
    #[serde(default)]
    pub payload: serde_json::Value,

    pub requested_by: String,
    #[serde(flatten)]
    pub state: ProposalState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Start a proposal for `tool`, copying its safety attributes.
    pub fn for_tool(tool: &dyn Tool, requested_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            proposal_id: Uuid::new_v4(),
            tool: tool.name().to_string(),
            risk: tool.risk(),
            scope: tool.scope(),
            idempotent: tool.idempotent(),
            target: String::new(),
            summary: String::new(),
            payload: serde_json::Value::Null,
            requested_by: requested_by.into(),
            state: ProposalState::Proposed,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Transition to a new state. Returns an error if the transition is invalid.
    pub fn transition(&mut self, new_state: ProposalState) -> Result<(), ApprovalError> {
        if !self.state.can_transition_to(&new_state, self.idempotent) {
            return Err(ApprovalError::InvalidTransition {
                proposal_id: self.proposal_id,
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }
        tracing::debug!(
            proposal_id = %self.proposal_id,
            from = %self.state,
            to = %new_state,
            "proposal transition"
        );
        self.state = new_state;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Hand the proposal to reviewers.
    pub fn submit(&mut self) -> Result<(), ApprovalError> {
        self.transition(ProposalState::PendingApproval)
    }

    /// Apply a reviewer's decision. Only valid while pending approval.
    pub fn decide(&mut self, decision: ApprovalDecision) -> Result<(), ApprovalError> {
        if self.state != ProposalState::PendingApproval {
            return Err(ApprovalError::NotPending {
                proposal_id: self.proposal_id,
                state: self.state.to_string(),
            });
        }
        let next = match decision {
            ApprovalDecision::Approve { by } => ProposalState::Approved { approved_by: by },
            ApprovalDecision::Reject { by, reason } => ProposalState::Rejected {
                rejected_by: by,
                reason,
            },
        };
        self.transition(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fg_tool::{ParamSchema, ToolContext, ToolResult, TransportError};

    struct Rotate {
        idempotent: bool,
    }

    #[async_trait]
    impl Tool for Rotate {
        fn name(&self) -> &str {
            "rotate"
        }
        fn description(&self) -> &str {
            "rotate a certificate"
        }
        fn parameters(&self) -> ParamSchema {
            ParamSchema::object()
        }
        fn risk(&self) -> RiskLevel {
            RiskLevel::StateChangeProd
        }
        fn scope(&self) -> Scope {
            Scope::Asset
        }
        fn idempotent(&self) -> bool {
            self.idempotent
        }
        fn requires_approval(&self) -> bool {
            true
        }
        async fn execute(
            &self,
            _ctx: &ToolContext,
            _params: serde_json::Value,
        ) -> Result<ToolResult, TransportError> {
            Ok(ToolResult::success(serde_json::Value::Null))
        }
    }

    fn proposal(idempotent: bool) -> Proposal {
        Proposal::for_tool(&Rotate { idempotent }, "agent-7")
            .with_target("cert-123")
            .with_summary("rotate cert-123")
    }

    #[test]
    fn copies_tool_attributes() {
        let p = proposal(false);
        assert_eq!(p.tool, "rotate");
        assert_eq!(p.risk, RiskLevel::StateChangeProd);
        assert_eq!(p.scope, Scope::Asset);
        assert_eq!(p.state, ProposalState::Proposed);
    }

    #[test]
    fn happy_path_lifecycle() {
        let mut p = proposal(false);
        p.submit().unwrap();
        p.decide(ApprovalDecision::approve("alice")).unwrap();
        p.transition(ProposalState::Executing).unwrap();
        p.transition(ProposalState::Completed).unwrap();
        assert!(p.state.is_terminal());
        assert!(!p.state.is_open());
    }

    #[test]
    fn rejection_is_terminal() {
        let mut p = proposal(true);
        p.submit().unwrap();
        p.decide(ApprovalDecision::reject("bob", "outside change window"))
            .unwrap();
        assert!(p.state.is_terminal());
        assert!(p.transition(ProposalState::Executing).is_err());
    }

    #[test]
    fn cannot_execute_without_approval() {
        let mut p = proposal(true);
        p.submit().unwrap();
        let err = p.transition(ProposalState::Executing).unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidTransition { .. }));
    }

    #[test]
    fn decision_requires_pending_state() {
        let mut p = proposal(true);
        let err = p.decide(ApprovalDecision::approve("alice")).unwrap_err();
        assert!(matches!(err, ApprovalError::NotPending { .. }));

        p.submit().unwrap();
        p.decide(ApprovalDecision::approve("alice")).unwrap();
        let err = p.decide(ApprovalDecision::approve("alice")).unwrap_err();
        assert!(matches!(err, ApprovalError::NotPending { .. }));
    }

    #[test]
    fn retry_after_failure_only_when_idempotent() {
        for idempotent in [true, false] {
            let mut p = proposal(idempotent);
            p.submit().unwrap();
            p.decide(ApprovalDecision::approve("alice")).unwrap();
            p.transition(ProposalState::Executing).unwrap();
            p.transition(ProposalState::Failed {
                reason: "upstream timeout".to_string(),
            })
            .unwrap();
            assert!(!p.state.is_terminal());
            assert_eq!(p.transition(ProposalState::Executing).is_ok(), idempotent);
        }
    }

    #[test]
    fn state_serializes_flattened() {
        let mut p = proposal(true);
        p.submit().unwrap();
        p.decide(ApprovalDecision::approve("alice")).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["state"], "approved");
        assert_eq!(json["approved_by"], "alice");

        let back: Proposal = serde_json::from_value(json).unwrap();
        assert_eq!(back.state, p.state);
    }
}
