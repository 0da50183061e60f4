// query.rs: Narrow interfaces to the fleet data store.
//
// Tools depend on these traits, never on a concrete store. Absent data is
// `Ok(None)` or an empty collection; `Err` means the store itself failed or
// refused a write.

use async_trait::async_trait;
use fg_approval::{ApprovalDecision, Proposal, ProposalState};
use fg_planning::Environment;
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{
    Alert, Asset, AssetFilter, Certificate, CertificateBinding, ChangeHistory, ComplianceReport,
    DrPair, DriftDetail, GoldenImage, PhaseRow, PlanRecord, RotationRecord,
};

#[async_trait]
pub trait AssetQuery: Send + Sync {
    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError>;

    async fn count_assets(&self, filter: &AssetFilter) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ImageQuery: Send + Sync {
    /// Newest published image of `family`.
    async fn latest_image(&self, family: &str) -> Result<Option<GoldenImage>, StoreError>;
}

#[async_trait]
pub trait CertificateQuery: Send + Sync {
    async fn certificate(&self, certificate_id: &str) -> Result<Option<Certificate>, StoreError>;

    async fn certificate_bindings(
        &self,
        certificate_id: &str,
    ) -> Result<Vec<CertificateBinding>, StoreError>;

    /// Rotations of `certificate_id`, oldest first.
    async fn rotation_history(
        &self,
        certificate_id: &str,
    ) -> Result<Vec<RotationRecord>, StoreError>;
}

#[async_trait]
pub trait ComplianceQuery: Send + Sync {
    async fn compliance_report(
        &self,
        env: Environment,
    ) -> Result<Option<ComplianceReport>, StoreError>;

    async fn drift_details(&self, env: Environment) -> Result<Vec<DriftDetail>, StoreError>;

    async fn dr_pair(&self, env: Environment) -> Result<Option<DrPair>, StoreError>;

    async fn change_history(&self, env: Environment) -> Result<Option<ChangeHistory>, StoreError>;
}

/// Transactional writes. Multi-record operations land completely or not at all.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Record a rotation together with its proposal. Fails with
    /// [`StoreError::Conflict`] if the certificate already has a rotation in
    /// flight.
    async fn create_rotation(
        &self,
        rotation: &RotationRecord,
        proposal: &Proposal,
    ) -> Result<(), StoreError>;

    /// Record a plan and its phase rows.
    async fn create_plan(&self, plan: &PlanRecord, phases: &[PhaseRow]) -> Result<(), StoreError>;

    async fn plan(&self, plan_id: Uuid) -> Result<Option<PlanRecord>, StoreError>;

    async fn phase_rows(&self, plan_id: Uuid) -> Result<Vec<PhaseRow>, StoreError>;

    /// Insert a new proposal. Fails with [`StoreError::Conflict`] if the id exists.
    async fn create_proposal(&self, proposal: &Proposal) -> Result<(), StoreError>;

    /// Insert `proposal` unless an open proposal from the same tool already
    /// targets the same thing. Returns the stored proposal and whether it
    /// was created by this call.
    async fn create_proposal_once(&self, proposal: &Proposal)
        -> Result<(Proposal, bool), StoreError>;

    async fn proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, StoreError>;

    /// All proposals, newest first.
    async fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError>;

    /// An open proposal from `tool` against `target`, if any.
    async fn find_open_proposal(
        &self,
        tool: &str,
        target: &str,
    ) -> Result<Option<Proposal>, StoreError>;

    /// Apply a reviewer decision to a pending proposal.
    async fn decide_proposal(
        &self,
        proposal_id: Uuid,
        decision: ApprovalDecision,
    ) -> Result<Proposal, StoreError>;

    /// Move a proposal through the execution states.
    async fn transition_proposal(
        &self,
        proposal_id: Uuid,
        next: ProposalState,
    ) -> Result<Proposal, StoreError>;

    async fn alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError>;

    /// Mark an alert acknowledged. Acknowledging twice is a no-op; a
    /// resolved alert cannot be acknowledged. The flag is true only for the
    /// call that moved the alert out of `open`.
    async fn acknowledge_alert(
        &self,
        alert_id: &str,
        by: &str,
    ) -> Result<(Alert, bool), StoreError>;
}

/// Everything a tool may need from the store.
pub trait FleetStore:
    AssetQuery + ImageQuery + CertificateQuery + ComplianceQuery + Persistence
{
}

impl<T> FleetStore for T where
    T: AssetQuery + ImageQuery + CertificateQuery + ComplianceQuery + Persistence
{
}
