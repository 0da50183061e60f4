// inventory.rs: Read-only inventory tools (assets, golden images, certificates).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fg_store::AssetFilter;
use fg_tool::{
    parse_params, ParamSchema, ResultMetadata, RiskLevel, Scope, Tool, ToolContext, ToolError,
    ToolResult, TransportError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{environment_schema, finish, guarded, Fault, Services};

pub const DEFAULT_ASSET_LIMIT: usize = 100;
pub const MAX_ASSET_LIMIT: i64 = 1000;

const SOURCE: &str = "fleet_store";

/// `query_assets`: list assets matching a filter.
pub struct QueryAssets {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct QueryAssetsParams {
    #[serde(flatten)]
    filter: AssetFilter,
    #[serde(default)]
    limit: Option<usize>,
}

impl QueryAssets {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let params: QueryAssetsParams = parse_params(&self.parameters(), params)?;
        let limit = params.limit.unwrap_or(DEFAULT_ASSET_LIMIT);

        let mut assets = guarded(ctx, self.services.store.list_assets(&params.filter)).await?;
        let total_matched = assets.len();
        let truncated = total_matched > limit;
        assets.truncate(limit);

        let metadata = ResultMetadata::from_source(SOURCE)
            .with_item_count(assets.len())
            .with_truncated(truncated);
        Ok(ToolResult::success_with_metadata(
            json!({
                "assets": assets,
                "returned": assets.len(),
                "total_matched": total_matched,
            }),
            metadata,
        ))
    }
}

#[async_trait]
impl Tool for QueryAssets {
    fn name(&self) -> &str {
        "query_assets"
    }

    fn description(&self) -> &str {
        "List fleet assets filtered by platform, region, environment, drift status or image family"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("platform", ParamSchema::string().describe("e.g. aws, azure"), false)
            .property("region", ParamSchema::string(), false)
            .property("environment", environment_schema(), false)
            .property(
                "drift_status",
                ParamSchema::enumeration(["in_sync", "drifted", "unknown"]),
                false,
            )
            .property("image_family", ParamSchema::string(), false)
            .property(
                "limit",
                ParamSchema::integer()
                    .int_range(Some(1), Some(MAX_ASSET_LIMIT))
                    .describe("Maximum assets returned; defaults to 100"),
                false,
            )
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::ReadOnly
    }

    fn scope(&self) -> Scope {
        Scope::Organization
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

/// `get_latest_image`: newest published golden image of a family.
pub struct GetLatestImage {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct FamilyParams {
    family: String,
}

impl GetLatestImage {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let params: FamilyParams = parse_params(&self.parameters(), params)?;
        let image = guarded(ctx, self.services.store.latest_image(&params.family))
            .await?
            .ok_or_else(|| ToolError::not_found("image family", &params.family))?;
        Ok(ToolResult::success_with_metadata(
            serde_json::to_value(&image)?,
            ResultMetadata::from_source(SOURCE),
        ))
    }
}

#[async_trait]
impl Tool for GetLatestImage {
    fn name(&self) -> &str {
        "get_latest_image"
    }

    fn description(&self) -> &str {
        "Return the newest published golden image of an image family"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object().property(
            "family",
            ParamSchema::string().describe("Image family, e.g. ubuntu-22-base"),
            true,
        )
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::ReadOnly
    }

    fn scope(&self) -> Scope {
        Scope::Organization
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

/// `get_certificate`: certificate details with blast radius and rotation history.
pub struct GetCertificate {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CertificateParams {
    pub(crate) certificate_id: String,
}

impl GetCertificate {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let params: CertificateParams = parse_params(&self.parameters(), params)?;
        let id = params.certificate_id.as_str();
        let store = &self.services.store;

        let certificate = guarded(ctx, store.certificate(id))
            .await?
            .ok_or_else(|| ToolError::not_found("certificate", id))?;
        let bindings = guarded(ctx, store.certificate_bindings(id)).await?;
        let history = guarded(ctx, store.rotation_history(id)).await?;

        let assets: BTreeSet<&str> = bindings.iter().map(|b| b.asset_id.as_str()).collect();
        let services: BTreeSet<&str> = bindings.iter().map(|b| b.service.as_str()).collect();
        let days_until_expiry = certificate.days_until_expiry(Utc::now());

        Ok(ToolResult::success_with_metadata(
            json!({
                "certificate": certificate,
                "days_until_expiry": days_until_expiry,
                "expired": days_until_expiry < 0,
                "bindings": bindings,
                "blast_radius": {
                    "asset_count": assets.len(),
                    "services": services,
                },
                "rotation_history": history,
                "rotation_in_flight": history.iter().any(|r| r.status.in_flight()),
            }),
            ResultMetadata::from_source(SOURCE),
        ))
    }
}

#[async_trait]
impl Tool for GetCertificate {
    fn name(&self) -> &str {
        "get_certificate"
    }

    fn description(&self) -> &str {
        "Show a certificate, the assets and services using it, and its rotation history"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object().property("certificate_id", ParamSchema::string(), true)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::ReadOnly
    }

    fn scope(&self) -> Scope {
        Scope::Asset
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
