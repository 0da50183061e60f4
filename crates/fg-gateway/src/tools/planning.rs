// planning.rs: Plan-only tools. They compute and explain; nothing in the
// fleet changes. `generate_patch_plan` keeps its output as an audit record.

use std::sync::Arc;

use async_trait::async_trait;
use fg_planning::{
    generate_patch_plan, score_risk, simulate_dr_failover, simulate_rollout, ChangeType, DrInput,
    DrSimulation, Environment, PatchPlanInput, ReplicationStatus, RiskInput, RiskScore,
    RolloutInput,
};
use fg_store::{AssetFilter, DrPair, PlanRecord};
use fg_tool::{
    parse_params, ParamSchema, ResultMetadata, RiskLevel, Scope, Tool, ToolContext, ToolError,
    ToolResult, TransportError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    change_type_schema, environment_schema, finish, guarded, percent_schema, Fault, Services,
};

const SOURCE: &str = "planner";

fn default_change_type() -> ChangeType {
    ChangeType::Patch
}

fn default_true() -> bool {
    true
}

/// Risk of a change scored against live history and drift.
pub(crate) struct LiveRisk {
    pub input: RiskInput,
    pub score: RiskScore,
}

pub(crate) async fn live_risk(
    services: &Services,
    ctx: &ToolContext,
    input: RiskInput,
    include_history: bool,
) -> Result<LiveRisk, Fault> {
    let mut input = input;
    if include_history {
        let env = input.environment;
        let history = guarded(ctx, services.store.change_history(env)).await?;
        if let Some(rate) = history.as_ref().and_then(|h| h.failure_rate()) {
            input = input.with_failure_rate(rate);
        }
        let drifted = guarded(ctx, services.store.drift_details(env)).await?.len();
        input = input.with_drift(drifted as u64);
    }
    let score = score_risk(&input)?;
    Ok(LiveRisk { input, score })
}

/// DR readiness of an environment as the store currently describes it.
pub(crate) struct DrReadiness {
    pub pair: Option<DrPair>,
    pub affected_assets: u64,
    pub simulation: DrSimulation,
}

pub(crate) async fn dr_readiness(
    services: &Services,
    ctx: &ToolContext,
    environment: Environment,
) -> Result<DrReadiness, Fault> {
    let pair = guarded(ctx, services.store.dr_pair(environment)).await?;
    let affected_assets = guarded(
        ctx,
        services.store.count_assets(&AssetFilter::environment(environment)),
    )
    .await?;

    let input = DrInput {
        environment,
        replication: pair
            .as_ref()
            .map_or(ReplicationStatus::Unknown, |p| p.replication),
        previously_tested: pair.as_ref().is_some_and(|p| p.last_failover_test.is_some()),
        dr_pair_configured: pair.is_some(),
        affected_assets,
        baseline_score: services.planning.dr_baseline_score,
    };
    let simulation = simulate_dr_failover(&input)?;
    Ok(DrReadiness {
        pair,
        affected_assets,
        simulation,
    })
}

async fn count_or(
    services: &Services,
    ctx: &ToolContext,
    environment: Environment,
    given: Option<u64>,
) -> Result<u64, Fault> {
    match given {
        Some(n) => Ok(n),
        None => {
            guarded(
                ctx,
                services.store.count_assets(&AssetFilter::environment(environment)),
            )
            .await
        }
    }
}

/// `generate_patch_plan`: phase a change across the matching assets.
pub struct GeneratePatchPlan {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct PatchPlanParams {
    environment: Environment,
    #[serde(default = "default_change_type")]
    change_type: ChangeType,
    #[serde(default)]
    canary_percent: Option<f64>,
    #[serde(default)]
    max_batch_percent: Option<f64>,
    #[serde(default)]
    max_waves: Option<u32>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    image_family: Option<String>,
}

impl GeneratePatchPlan {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: PatchPlanParams = parse_params(&self.parameters(), params)?;
        let defaults = &self.services.planning;

        let filter = AssetFilter {
            platform: p.platform,
            region: p.region,
            environment: Some(p.environment),
            image_family: p.image_family,
            ..AssetFilter::default()
        };
        let total = guarded(ctx, self.services.store.count_assets(&filter)).await?;
        if total == 0 {
            return Err(ToolError::precondition_failed(format!(
                "no {} assets match the filter",
                p.environment
            ))
            .with_details(json!({ "filter": filter }))
            .into());
        }

        let mut input = PatchPlanInput::new(total, p.environment)
            .with_change_type(p.change_type)
            .with_percentages(
                p.canary_percent.unwrap_or(defaults.canary_percent),
                p.max_batch_percent.unwrap_or(defaults.max_batch_percent),
            );
        if let Some(limit) = p.max_waves.or(defaults.max_waves) {
            input = input.with_max_waves(limit);
        }
        let plan = generate_patch_plan(&input)?;

        let record = PlanRecord::new(plan, ctx.actor.clone());
        let rows = record.phase_rows();
        guarded(ctx, self.services.store.create_plan(&record, &rows)).await?;

        tracing::info!(
            plan_id = %record.plan_id,
            environment = %record.environment,
            assets = total,
            waves = record.plan.wave_count(),
            "patch plan recorded"
        );

        Ok(ToolResult::success_with_metadata(
            json!({
                "plan_id": record.plan_id,
                "environment": record.environment,
                "change_type": record.change_type,
                "total_assets": total,
                "wave_count": record.plan.wave_count(),
                "estimated_total_minutes": record.plan.estimated_total_minutes,
                "plan": record.plan,
            }),
            ResultMetadata::from_source(SOURCE).with_item_count(rows.len()),
        ))
    }
}

#[async_trait]
impl Tool for GeneratePatchPlan {
    fn name(&self) -> &str {
        "generate_patch_plan"
    }

    fn description(&self) -> &str {
        "Build a phased patch plan (pre-flight, canary, waves, post-validation) for matching assets and record it"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("environment", environment_schema(), true)
            .property("change_type", change_type_schema(), false)
            .property(
                "canary_percent",
                percent_schema("Share of assets in the canary phase"),
                false,
            )
            .property(
                "max_batch_percent",
                percent_schema("Largest share of assets in one wave"),
                false,
            )
            .property(
                "max_waves",
                ParamSchema::integer().int_range(Some(1), None),
                false,
            )
            .property("platform", ParamSchema::string(), false)
            .property("region", ParamSchema::string(), false)
            .property("image_family", ParamSchema::string(), false)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::PlanOnly
    }

    fn scope(&self) -> Scope {
        Scope::Environment
    }

    // Repeat calls yield the same plan under a new audit record.
    fn idempotent(&self) -> bool {
        true
    }

    fn requires_approval(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}

/// `assess_risk`: weighted risk score for a change.
pub struct AssessRisk {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct AssessRiskParams {
    environment: Environment,
    #[serde(default = "default_change_type")]
    change_type: ChangeType,
    #[serde(default)]
    asset_count: Option<u64>,
    #[serde(default = "default_true")]
    include_history: bool,
}

impl AssessRisk {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: AssessRiskParams = parse_params(&self.parameters(), params)?;
        let count = count_or(&self.services, ctx, p.environment, p.asset_count).await?;
        let risk = live_risk(
            &self.services,
            ctx,
            RiskInput::new(p.environment, count, p.change_type),
            p.include_history,
        )
        .await?;

        Ok(ToolResult::success_with_metadata(
            json!({
                "environment": p.environment,
                "change_type": p.change_type,
                "inputs": risk.input,
                "risk": risk.score,
            }),
            ResultMetadata::from_source(SOURCE).with_item_count(risk.score.factors.len()),
        ))
    }
}

#[async_trait]
impl Tool for AssessRisk {
    fn name(&self) -> &str {
        "assess_risk"
    }

    fn description(&self) -> &str {
        "Score the risk of a change from environment, scale, change type and recent failure and drift history"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("environment", environment_schema(), true)
            .property("change_type", change_type_schema(), false)
            .property(
                "asset_count",
                ParamSchema::integer()
                    .int_range(Some(0), None)
                    .describe("Assets affected; counted from the inventory when omitted"),
                false,
            )
            .property(
                "include_history",
                ParamSchema::boolean().describe("Use recent failure rate and drift; defaults to true"),
                false,
            )
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::PlanOnly
    }

    fn scope(&self) -> Scope {
        Scope::Environment
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn requires_approval(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}

/// `simulate_dr_failover`: readiness of an environment's DR pair.
pub struct SimulateDrFailover {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct DrParams {
    environment: Environment,
}

impl SimulateDrFailover {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let DrParams { environment } = parse_params(&self.parameters(), params)?;
        let readiness = dr_readiness(&self.services, ctx, environment).await?;
        Ok(ToolResult::success_with_metadata(
            json!({
                "environment": environment,
                "dr_pair": readiness.pair,
                "affected_assets": readiness.affected_assets,
                "simulation": readiness.simulation,
            }),
            ResultMetadata::from_source(SOURCE),
        ))
    }
}

#[async_trait]
impl Tool for SimulateDrFailover {
    fn name(&self) -> &str {
        "simulate_dr_failover"
    }

    fn description(&self) -> &str {
        "Simulate a disaster-recovery failover and report readiness, issues and a runbook"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object().property("environment", environment_schema(), true)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::PlanOnly
    }

    fn scope(&self) -> Scope {
        Scope::Environment
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn requires_approval(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}

/// `simulate_rollout`: timing and expected failures of a phased rollout.
pub struct SimulateRollout {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct RolloutParams {
    environment: Environment,
    #[serde(default = "default_change_type")]
    change_type: ChangeType,
    #[serde(default)]
    asset_count: Option<u64>,
    #[serde(default)]
    canary_percent: Option<f64>,
    #[serde(default)]
    max_batch_percent: Option<f64>,
}

impl SimulateRollout {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let p: RolloutParams = parse_params(&self.parameters(), params)?;
        let count = count_or(&self.services, ctx, p.environment, p.asset_count).await?;
        if count == 0 {
            return Err(ToolError::precondition_failed(format!(
                "no {} assets to roll out to",
                p.environment
            ))
            .into());
        }

        let mut input = RolloutInput::new(p.environment, p.change_type, count);
        input.canary_percent = p.canary_percent.unwrap_or(self.services.planning.canary_percent);
        input.max_batch_percent = p
            .max_batch_percent
            .unwrap_or(self.services.planning.max_batch_percent);
        let simulation = simulate_rollout(&input)?;

        Ok(ToolResult::success_with_metadata(
            json!({
                "environment": p.environment,
                "change_type": p.change_type,
                "asset_count": count,
                "likely_to_abort": simulation.likely_to_abort(),
                "simulation": simulation,
            }),
            ResultMetadata::from_source(SOURCE),
        ))
    }
}

#[async_trait]
impl Tool for SimulateRollout {
    fn name(&self) -> &str {
        "simulate_rollout"
    }

    fn description(&self) -> &str {
        "Estimate duration, expected failures and abort likelihood of a phased rollout"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("environment", environment_schema(), true)
            .property("change_type", change_type_schema(), false)
            .property(
                "asset_count",
                ParamSchema::integer().int_range(Some(1), None),
                false,
            )
            .property("canary_percent", percent_schema("Share of assets in the canary phase"), false)
            .property(
                "max_batch_percent",
                percent_schema("Largest share of assets in one wave"),
                false,
            )
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::PlanOnly
    }

    fn scope(&self) -> Scope {
        Scope::Environment
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn requires_approval(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, TransportError> {
        finish(self.run(ctx, params).await)
    }
}
