// posture.rs: Compliance and drift posture of one environment.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fg_planning::estimate::percent_of;
use fg_planning::{assess_compliance, ComplianceCounts, Environment};
use fg_store::AssetFilter;
use fg_tool::{
    parse_params, ParamSchema, ResultMetadata, RiskLevel, Scope, Tool, ToolContext, ToolResult,
    TransportError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{environment_schema, finish, guarded, Fault, Services};

/// `get_compliance_summary`: pass rate, status and evidence readiness.
pub struct GetComplianceSummary {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentParams {
    environment: Environment,
}

impl GetComplianceSummary {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let EnvironmentParams { environment } = parse_params(&self.parameters(), params)?;
        let report = guarded(ctx, self.services.store.compliance_report(environment)).await?;

        // No scan yet is reported as `no_data`, not as an error.
        let (assessment, scanned_at) = match &report {
            Some(r) => (assess_compliance(r.counts, &r.failures), Some(r.scanned_at)),
            None => (assess_compliance(ComplianceCounts::default(), &[]), None),
        };

        Ok(ToolResult::success_with_metadata(
            json!({
                "environment": environment,
                "scanned_at": scanned_at,
                "assessment": assessment,
            }),
            ResultMetadata::from_source("fleet_store")
                .with_item_count(assessment.failing_controls.len()),
        ))
    }
}

#[async_trait]
impl Tool for GetComplianceSummary {
    fn name(&self) -> &str {
        "get_compliance_summary"
    }

    fn description(&self) -> &str {
        "Summarize the latest compliance scan of an environment: pass rate, failing controls, evidence readiness"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object().property("environment", environment_schema(), true)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::ReadOnly
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

/// `get_drift_report`: assets running something other than their expected image.
pub struct GetDriftReport {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct DriftParams {
    environment: Environment,
    #[serde(default)]
    image_family: Option<String>,
}

impl GetDriftReport {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let params: DriftParams = parse_params(&self.parameters(), params)?;
        let store = &self.services.store;

        let filter = AssetFilter {
            environment: Some(params.environment),
            image_family: params.image_family.clone(),
            ..AssetFilter::default()
        };
        let total = guarded(ctx, store.count_assets(&filter)).await?;
        let mut details = guarded(ctx, store.drift_details(params.environment)).await?;
        if let Some(family) = &params.image_family {
            details.retain(|d| d.image_family.eq_ignore_ascii_case(family));
        }

        let mut by_family: BTreeMap<&str, u64> = BTreeMap::new();
        for d in &details {
            *by_family.entry(d.image_family.as_str()).or_default() += 1;
        }
        let drifted = details.len() as u64;

        Ok(ToolResult::success_with_metadata(
            json!({
                "environment": params.environment,
                "total_assets": total,
                "drifted_assets": drifted,
                "drift_percent": percent_of(drifted, total),
                "by_family": by_family,
                "details": details,
            }),
            ResultMetadata::from_source("fleet_store").with_item_count(details.len()),
        ))
    }
}

#[async_trait]
impl Tool for GetDriftReport {
    fn name(&self) -> &str {
        "get_drift_report"
    }

    fn description(&self) -> &str {
        "Report assets whose image version differs from the expected golden image"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("environment", environment_schema(), true)
            .property("image_family", ParamSchema::string(), false)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::ReadOnly
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fg_approval::LoggingApprovalGate;
    use fg_store::{FleetSnapshot, MemoryStore};

    fn services() -> Arc<Services> {
        Arc::new(Services::new(
            Arc::new(MemoryStore::new(FleetSnapshot::demo(Utc::now()))),
            Arc::new(LoggingApprovalGate),
        ))
    }

    #[tokio::test]
    async fn compliance_summary_for_scanned_environment() {
        let tool = GetComplianceSummary::new(services());
        let result = tool
            .execute(&ToolContext::new("tester"), json!({"environment": "production"}))
            .await
            .unwrap();
        let assessment = &result.data().unwrap()["assessment"];
        // 188 of 194 evaluated controls passed.
        assert_eq!(assessment["pass_rate"], 96.91);
        assert_eq!(assessment["status"], "compliant");
        assert_eq!(assessment["evidence_ready"], true);
    }

    #[tokio::test]
    async fn compliance_summary_without_scan_is_no_data() {
        let tool = GetComplianceSummary::new(services());
        let result = tool
            .execute(&ToolContext::new("tester"), json!({"environment": "dev"}))
            .await
            .unwrap();
        assert!(result.is_success());
        let data = result.data().unwrap();
        assert_eq!(data["assessment"]["status"], "no_data");
        assert!(data["assessment"]["pass_rate"].is_null());
        assert!(data["scanned_at"].is_null());
    }

    #[tokio::test]
    async fn drift_report_counts_and_groups() {
        let tool = GetDriftReport::new(services());
        let result = tool
            .execute(&ToolContext::new("tester"), json!({"environment": "production"}))
            .await
            .unwrap();
        let data = result.data().unwrap();
        assert_eq!(data["total_assets"], 150);
        assert_eq!(data["drifted_assets"], 6);
        assert_eq!(data["drift_percent"], 4.0);
        assert_eq!(data["by_family"]["ubuntu-22-base"], 6);
    }

    #[tokio::test]
    async fn drift_report_for_unknown_family_is_empty() {
        let tool = GetDriftReport::new(services());
        let result = tool
            .execute(
                &ToolContext::new("tester"),
                json!({"environment": "production", "image_family": "windows-2022"}),
            )
            .await
            .unwrap();
        let data = result.data().unwrap();
        assert_eq!(data["total_assets"], 0);
        assert_eq!(data["drift_percent"], 0.0);
    }
}
