// memory.rs: MemoryStore, an in-process FleetStore over a FleetSnapshot.
//
// All reads share one RwLock; every write, including the multi-record ones,
// takes the write lock once, checks its preconditions and then mutates, so
// a refused write leaves nothing behind.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fg_approval::{ApprovalDecision, Proposal, ProposalState};
use fg_planning::Environment;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::{AssetQuery, CertificateQuery, ComplianceQuery, ImageQuery, Persistence};
use crate::records::{
    Alert, AlertState, Asset, AssetFilter, Certificate, CertificateBinding, ChangeHistory,
    ComplianceReport, DrPair, DriftDetail, GoldenImage, ImageStatus, PhaseRow, PlanRecord,
    RotationRecord, RotationStatus,
};
use crate::snapshot::FleetSnapshot;

pub struct MemoryStore {
    data: RwLock<FleetSnapshot>,
    latency: Option<Duration>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(snapshot: FleetSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
            latency: None,
            offline: AtomicBool::new(false),
        }
    }

    pub fn empty() -> Self {
        Self::new(FleetSnapshot::default())
    }

    /// Open the snapshot at `path`, empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(FleetSnapshot::load_or_default(path)?))
    }

    /// Delay every operation by `latency`, as a remote store would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Simulate losing the connection to the store.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> FleetSnapshot {
        self.data.read().await.clone()
    }

    /// Write the current state to `path`.
    pub async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = self.data.read().await;
        snapshot.save(path)?;
        tracing::debug!(path = %path.display(), "fleet snapshot saved");
        Ok(())
    }

    async fn ready(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

fn proposal_mut<'a>(
    data: &'a mut FleetSnapshot,
    proposal_id: Uuid,
) -> Result<&'a mut Proposal, StoreError> {
    data.proposals
        .iter_mut()
        .find(|p| p.proposal_id == proposal_id)
        .ok_or_else(|| StoreError::not_found("proposal", proposal_id))
}

/// Keep rotation records in step with their proposal.
fn sync_rotation(data: &mut FleetSnapshot, proposal: &Proposal) {
    let status = match proposal.state {
        ProposalState::Rejected { .. } => RotationStatus::Cancelled,
        ProposalState::Executing => RotationStatus::InProgress,
        ProposalState::Completed => RotationStatus::Completed,
        ProposalState::Failed { .. } => RotationStatus::Failed,
        _ => return,
    };
    for rotation in data
        .rotations
        .iter_mut()
        .filter(|r| r.proposal_id == proposal.proposal_id)
    {
        rotation.status = status;
    }
}

#[async_trait]
impl AssetQuery for MemoryStore {
    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .assets
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn count_assets(&self, filter: &AssetFilter) -> Result<u64, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data.assets.iter().filter(|a| filter.matches(a)).count() as u64)
    }
}

#[async_trait]
impl ImageQuery for MemoryStore {
    async fn latest_image(&self, family: &str) -> Result<Option<GoldenImage>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .images
            .iter()
            .filter(|i| i.family == family && i.status == ImageStatus::Published)
            .max_by_key(|i| i.published_at)
            .cloned())
    }
}

#[async_trait]
impl CertificateQuery for MemoryStore {
    async fn certificate(&self, certificate_id: &str) -> Result<Option<Certificate>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .certificates
            .iter()
            .find(|c| c.certificate_id == certificate_id)
            .cloned())
    }

    async fn certificate_bindings(
        &self,
        certificate_id: &str,
    ) -> Result<Vec<CertificateBinding>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .bindings
            .iter()
            .filter(|b| b.certificate_id == certificate_id)
            .cloned()
            .collect())
    }

    async fn rotation_history(
        &self,
        certificate_id: &str,
    ) -> Result<Vec<RotationRecord>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        let mut history: Vec<RotationRecord> = data
            .rotations
            .iter()
            .filter(|r| r.certificate_id == certificate_id)
            .cloned()
            .collect();
        history.sort_by_key(|r| r.created_at);
        Ok(history)
    }
}

#[async_trait]
impl ComplianceQuery for MemoryStore {
    async fn compliance_report(
        &self,
        env: Environment,
    ) -> Result<Option<ComplianceReport>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .compliance
            .iter()
            .filter(|r| r.environment == env)
            .max_by_key(|r| r.scanned_at)
            .cloned())
    }

    async fn drift_details(&self, env: Environment) -> Result<Vec<DriftDetail>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .drift
            .iter()
            .filter(|d| d.environment == env)
            .cloned()
            .collect())
    }

    async fn dr_pair(&self, env: Environment) -> Result<Option<DrPair>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data.dr_pairs.iter().find(|p| p.environment == env).cloned())
    }

    async fn change_history(&self, env: Environment) -> Result<Option<ChangeHistory>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .change_history
            .iter()
            .find(|h| h.environment == env)
            .cloned())
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn create_rotation(
        &self,
        rotation: &RotationRecord,
        proposal: &Proposal,
    ) -> Result<(), StoreError> {
        self.ready().await?;
        let mut data = self.data.write().await;
        if let Some(existing) = data
            .rotations
            .iter()
            .find(|r| r.certificate_id == rotation.certificate_id && r.status.in_flight())
        {
            return Err(StoreError::Conflict(format!(
                "certificate {} already has rotation {} in flight",
                rotation.certificate_id, existing.rotation_id
            )));
        }
        if data
            .proposals
            .iter()
            .any(|p| p.proposal_id == proposal.proposal_id)
        {
            return Err(StoreError::Conflict(format!(
                "proposal {} already exists",
                proposal.proposal_id
            )));
        }
        data.rotations.push(rotation.clone());
        data.proposals.push(proposal.clone());
        Ok(())
    }

    async fn create_plan(&self, plan: &PlanRecord, phases: &[PhaseRow]) -> Result<(), StoreError> {
        self.ready().await?;
        if let Some(row) = phases.iter().find(|r| r.plan_id != plan.plan_id) {
            return Err(StoreError::Conflict(format!(
                "phase row {} belongs to plan {}, not {}",
                row.sequence, row.plan_id, plan.plan_id
            )));
        }
        let mut data = self.data.write().await;
        if data.plans.iter().any(|p| p.plan_id == plan.plan_id) {
            return Err(StoreError::Conflict(format!(
                "plan {} already exists",
                plan.plan_id
            )));
        }
        data.plans.push(plan.clone());
        data.phases.extend_from_slice(phases);
        Ok(())
    }

    async fn plan(&self, plan_id: Uuid) -> Result<Option<PlanRecord>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data.plans.iter().find(|p| p.plan_id == plan_id).cloned())
    }

    async fn phase_rows(&self, plan_id: Uuid) -> Result<Vec<PhaseRow>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        let mut rows: Vec<PhaseRow> = data
            .phases
            .iter()
            .filter(|r| r.plan_id == plan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.sequence);
        Ok(rows)
    }

    async fn create_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        self.ready().await?;
        let mut data = self.data.write().await;
        if data
            .proposals
            .iter()
            .any(|p| p.proposal_id == proposal.proposal_id)
        {
            return Err(StoreError::Conflict(format!(
                "proposal {} already exists",
                proposal.proposal_id
            )));
        }
        data.proposals.push(proposal.clone());
        Ok(())
    }

    async fn create_proposal_once(
        &self,
        proposal: &Proposal,
    ) -> Result<(Proposal, bool), StoreError> {
        self.ready().await?;
        let mut data = self.data.write().await;
        if let Some(existing) = data.proposals.iter().find(|p| {
            p.tool == proposal.tool && p.target == proposal.target && p.state.is_open()
        }) {
            return Ok((existing.clone(), false));
        }
        data.proposals.push(proposal.clone());
        Ok((proposal.clone(), true))
    }

    async fn proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .proposals
            .iter()
            .find(|p| p.proposal_id == proposal_id)
            .cloned())
    }

    async fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        let mut proposals = data.proposals.clone();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn find_open_proposal(
        &self,
        tool: &str,
        target: &str,
    ) -> Result<Option<Proposal>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data
            .proposals
            .iter()
            .find(|p| p.tool == tool && p.target == target && p.state.is_open())
            .cloned())
    }

    async fn decide_proposal(
        &self,
        proposal_id: Uuid,
        decision: ApprovalDecision,
    ) -> Result<Proposal, StoreError> {
        self.ready().await?;
        let mut data = self.data.write().await;
        let proposal = proposal_mut(&mut data, proposal_id)?;
        proposal.decide(decision)?;
        let updated = proposal.clone();
        sync_rotation(&mut data, &updated);
        Ok(updated)
    }

    async fn transition_proposal(
        &self,
        proposal_id: Uuid,
        next: ProposalState,
    ) -> Result<Proposal, StoreError> {
        self.ready().await?;
        let mut data = self.data.write().await;
        let proposal = proposal_mut(&mut data, proposal_id)?;
        proposal.transition(next)?;
        let updated = proposal.clone();
        sync_rotation(&mut data, &updated);
        Ok(updated)
    }

    async fn alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        self.ready().await?;
        let data = self.data.read().await;
        Ok(data.alerts.iter().find(|a| a.alert_id == alert_id).cloned())
    }

    async fn acknowledge_alert(
        &self,
        alert_id: &str,
        by: &str,
    ) -> Result<(Alert, bool), StoreError> {
        self.ready().await?;
        let mut data = self.data.write().await;
        let alert = data
            .alerts
            .iter_mut()
            .find(|a| a.alert_id == alert_id)
            .ok_or_else(|| StoreError::not_found("alert", alert_id))?;
        let changed = match alert.state {
            AlertState::Open => {
                alert.state = AlertState::Acknowledged;
                alert.acknowledged_by = Some(by.to_string());
                alert.acknowledged_at = Some(Utc::now());
                true
            }
            AlertState::Acknowledged => false,
            AlertState::Resolved => {
                return Err(StoreError::Conflict(format!(
                    "alert {} is already resolved",
                    alert_id
                )));
            }
        };
        Ok((alert.clone(), changed))
    }
}
