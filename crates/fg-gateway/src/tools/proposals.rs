// proposals.rs: State-changing tools.
//
// None of these touch the fleet. Each one validates its preconditions,
// records a proposal in `pending_approval` and announces it through the
// approval gate. Execution happens elsewhere once a reviewer approves.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fg_approval::Proposal;
use fg_planning::{DrStatus, Environment, RiskInput};
use fg_store::{RotationRecord, RotationStatus};
use fg_tool::{
    parse_params, ParamSchema, ResultMetadata, RiskLevel, Scope, Tool, ToolContext, ToolError,
    ToolResult, TransportError,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::planning::{dr_readiness, live_risk};
use super::{environment_schema, finish, guarded, parse_uuid, Fault, Services};

const SOURCE: &str = "approval_gate";

/// Tell reviewers about a stored proposal. The proposal is already durable,
/// so a gate failure is logged and not returned.
async fn announce(services: &Services, proposal: &Proposal) {
    if let Err(e) = services.gate.submit(proposal).await {
        tracing::warn!(
            proposal_id = %proposal.proposal_id,
            tool = %proposal.tool,
            "approval gate did not accept proposal: {}",
            e
        );
    }
}

/// Result body shared by every proposal tool, plus tool-specific fields.
fn proposal_result(proposal: &Proposal, extra: Value) -> ToolResult {
    let mut body = Map::new();
    body.insert("proposal_id".into(), json!(proposal.proposal_id));
    body.insert("state".into(), json!(proposal.state.to_string()));
    body.insert("requires_approval".into(), json!(true));
    body.insert("target".into(), json!(proposal.target));
    body.insert("summary".into(), json!(proposal.summary));
    if let Value::Object(fields) = extra {
        body.extend(fields);
    }
    ToolResult::success_with_metadata(Value::Object(body), ResultMetadata::from_source(SOURCE))
}

/// `propose_certificate_rotation`: request a new certificate for a binding set.
pub struct ProposeCertificateRotation {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct RotationParams {
    certificate_id: String,
    #[serde(default)]
    reason: Option<String>,
}

impl ProposeCertificateRotation {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: RotationParams = parse_params(&self.parameters(), params)?;
        let store = &self.services.store;
        let id = p.certificate_id.as_str();

        let certificate = guarded(ctx, store.certificate(id))
            .await?
            .ok_or_else(|| ToolError::not_found("certificate", id))?;
        let bindings = guarded(ctx, store.certificate_bindings(id)).await?;

        let mut proposal = Proposal::for_tool(self, ctx.actor.clone())
            .with_target(id)
            .with_summary(format!(
                "rotate certificate {} ({}) used by {} binding(s)",
                id,
                certificate.common_name,
                bindings.len()
            ))
            .with_payload(json!({
                "certificate_id": id,
                "common_name": certificate.common_name,
                "not_after": certificate.not_after,
                "bindings": bindings,
                "reason": p.reason,
            }));
        proposal.submit()?;

        let rotation = RotationRecord {
            rotation_id: Uuid::new_v4(),
            certificate_id: id.to_string(),
            proposal_id: proposal.proposal_id,
            status: RotationStatus::Pending,
            requested_by: ctx.actor.clone(),
            created_at: Utc::now(),
        };
        // Conflict when a rotation of this certificate is already in flight.
        guarded(ctx, store.create_rotation(&rotation, &proposal)).await?;
        announce(&self.services, &proposal).await;

        Ok(proposal_result(
            &proposal,
            json!({ "rotation_id": rotation.rotation_id }),
        ))
    }
}

#[async_trait]
impl Tool for ProposeCertificateRotation {
    fn name(&self) -> &str {
        "propose_certificate_rotation"
    }

    fn description(&self) -> &str {
        "Propose rotating a certificate; queued for approval, refused while another rotation is in flight"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("certificate_id", ParamSchema::string(), true)
            .property("reason", ParamSchema::string(), false)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::StateChangeProd
    }

    fn scope(&self) -> Scope {
        Scope::Asset
    }

    fn idempotent(&self) -> bool {
        false
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}

/// `propose_image_build`: request a new golden image build for a family.
pub struct ProposeImageBuild {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct ImageBuildParams {
    family: String,
    #[serde(default)]
    base_version: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl ProposeImageBuild {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: ImageBuildParams = parse_params(&self.parameters(), params)?;
        let base = match p.base_version {
            Some(v) => v,
            None => {
                guarded(ctx, self.services.store.latest_image(&p.family))
                    .await?
                    .ok_or_else(|| ToolError::not_found("image family", &p.family))?
                    .version
            }
        };

        let mut proposal = Proposal::for_tool(self, ctx.actor.clone())
            .with_target(format!("{}@{}", p.family, base))
            .with_summary(format!("build a new {} image from {}", p.family, base))
            .with_payload(json!({
                "family": p.family,
                "base_version": base,
                "reason": p.reason,
            }));
        proposal.submit()?;

        let (stored, created) =
            guarded(ctx, self.services.store.create_proposal_once(&proposal)).await?;
        if created {
            announce(&self.services, &stored).await;
        } else {
            tracing::info!(
                proposal_id = %stored.proposal_id,
                target = %stored.target,
                "image build already proposed; returning the open proposal"
            );
        }

        Ok(proposal_result(&stored, json!({ "created": created })))
    }
}

#[async_trait]
impl Tool for ProposeImageBuild {
    fn name(&self) -> &str {
        "propose_image_build"
    }

    fn description(&self) -> &str {
        "Propose building a golden image; repeating the request returns the open proposal"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("family", ParamSchema::string(), true)
            .property(
                "base_version",
                ParamSchema::string().describe("Defaults to the latest published version"),
                false,
            )
            .property("reason", ParamSchema::string(), false)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::StateChangeNonprod
    }

    fn scope(&self) -> Scope {
        Scope::Organization
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}

/// `propose_patch_rollout`: request execution of a recorded patch plan.
pub struct ProposePatchRollout {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct RolloutProposalParams {
    plan_id: String,
    #[serde(default)]
    change_window: Option<String>,
}

impl ProposePatchRollout {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: RolloutProposalParams = parse_params(&self.parameters(), params)?;
        let plan_id = parse_uuid("plan_id", &p.plan_id)?;

        let record = guarded(ctx, self.services.store.plan(plan_id))
            .await?
            .ok_or_else(|| ToolError::not_found("plan", &p.plan_id))?;
        let plan = &record.plan;
        let risk = live_risk(
            &self.services,
            ctx,
            RiskInput::new(plan.environment, plan.total_assets, plan.change_type),
            true,
        )
        .await?
        .score;

        let mut proposal = Proposal::for_tool(self, ctx.actor.clone())
            .with_target(plan_id.to_string())
            .with_summary(format!(
                "{} rollout to {} {} assets in {} wave(s), risk {}",
                plan.change_type,
                plan.total_assets,
                plan.environment,
                plan.wave_count(),
                risk.band
            ))
            .with_payload(json!({
                "plan_id": plan_id,
                "environment": plan.environment,
                "change_type": plan.change_type,
                "total_assets": plan.total_assets,
                "wave_count": plan.wave_count(),
                "estimated_total_minutes": plan.estimated_total_minutes,
                "change_window": p.change_window,
                "risk": risk,
            }));
        proposal.submit()?;

        let (stored, created) =
            guarded(ctx, self.services.store.create_proposal_once(&proposal)).await?;
        if !created {
            return Err(ToolError::conflict(format!(
                "plan {} already has open rollout proposal {}",
                plan_id, stored.proposal_id
            ))
            .with_details(json!({ "proposal_id": stored.proposal_id }))
            .into());
        }
        announce(&self.services, &stored).await;

        Ok(proposal_result(
            &stored,
            json!({ "plan_id": plan_id, "risk": risk }),
        ))
    }
}

#[async_trait]
impl Tool for ProposePatchRollout {
    fn name(&self) -> &str {
        "propose_patch_rollout"
    }

    fn description(&self) -> &str {
        "Propose executing a recorded patch plan; the proposal carries the plan's live risk score"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property(
                "plan_id",
                ParamSchema::string().describe("Id returned by generate_patch_plan"),
                true,
            )
            .property(
                "change_window",
                ParamSchema::string().describe("Requested window, free text"),
                false,
            )
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::StateChangeProd
    }

    fn scope(&self) -> Scope {
        Scope::Environment
    }

    fn idempotent(&self) -> bool {
        false
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}

/// `propose_dr_failover`: request failing an environment over to its DR site.
pub struct ProposeDrFailover {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct FailoverParams {
    environment: Environment,
    #[serde(default)]
    reason: Option<String>,
}

impl ProposeDrFailover {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: FailoverParams = parse_params(&self.parameters(), params)?;
        let readiness = dr_readiness(&self.services, ctx, p.environment).await?;
        let sim = &readiness.simulation;

        if sim.status == DrStatus::NotReady {
            return Err(ToolError::precondition_failed(format!(
                "{} is not ready for DR failover (readiness {})",
                p.environment, sim.readiness_score
            ))
            .with_details(json!({
                "readiness_score": sim.readiness_score,
                "critical_issues": sim.critical_issues,
            }))
            .into());
        }

        let mut proposal = Proposal::for_tool(self, ctx.actor.clone())
            .with_target(p.environment.as_str())
            .with_summary(format!(
                "fail {} over to its DR site (readiness {}, {})",
                p.environment, sim.readiness_score, sim.status
            ))
            .with_payload(json!({
                "environment": p.environment,
                "dr_pair": readiness.pair,
                "reason": p.reason,
                "simulation": sim,
            }));
        proposal.submit()?;

        let (stored, created) =
            guarded(ctx, self.services.store.create_proposal_once(&proposal)).await?;
        if !created {
            return Err(ToolError::conflict(format!(
                "{} already has open failover proposal {}",
                p.environment, stored.proposal_id
            ))
            .with_details(json!({ "proposal_id": stored.proposal_id }))
            .into());
        }
        announce(&self.services, &stored).await;

        Ok(proposal_result(
            &stored,
            json!({
                "readiness_score": sim.readiness_score,
                "readiness_status": sim.status,
                "warnings": sim.warnings,
            }),
        ))
    }
}

#[async_trait]
impl Tool for ProposeDrFailover {
    fn name(&self) -> &str {
        "propose_dr_failover"
    }

    fn description(&self) -> &str {
        "Propose a DR failover; refused when the readiness simulation says not_ready"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("environment", environment_schema(), true)
            .property("reason", ParamSchema::string(), false)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::StateChangeProd
    }

    fn scope(&self) -> Scope {
        Scope::Organization
    }

    fn idempotent(&self) -> bool {
        false
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}
