// alerts.rs: `acknowledge_alert`, the one state-changing tool exempt from approval.
//
// Acknowledging only records who has seen an alert. It is idempotent and
// changes nothing on the asset itself, which is what the exemption rests on.

use std::sync::Arc;

use async_trait::async_trait;
use fg_tool::{
    parse_params, ParamSchema, ResultMetadata, RiskLevel, Scope, Tool, ToolContext,
    ToolResult, TransportError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{finish, guarded, Fault, Services};

pub struct AcknowledgeAlert {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
struct AcknowledgeParams {
    alert_id: String,
}

impl AcknowledgeAlert {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn run(&self, ctx: &ToolContext, params: Value) -> Result<ToolResult, Fault> {
        let AcknowledgeParams { alert_id } = parse_params(&self.parameters(), params)?;
        let store = &self.services.store;

        let (alert, changed) =
            guarded(ctx, store.acknowledge_alert(&alert_id, &ctx.actor)).await?;
        let already_acknowledged = !changed;

        if !already_acknowledged {
            tracing::info!(alert_id = %alert_id, actor = %ctx.actor, "alert acknowledged");
        }
        Ok(ToolResult::success_with_metadata(
            json!({
                "alert": alert,
                "already_acknowledged": already_acknowledged,
            }),
            ResultMetadata::from_source("fleet_store"),
        ))
    }
}

#[async_trait]
impl Tool for AcknowledgeAlert {
    fn name(&self) -> &str {
        "acknowledge_alert"
    }

    fn description(&self) -> &str {
        "Mark an alert as acknowledged by the caller; repeating it is harmless"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object().property("alert_id", ParamSchema::string(), true)
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::StateChangeNonprod
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

    fn approval_exempt(&self) -> bool {
        true
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
    use fg_store::{AlertState, FleetSnapshot, MemoryStore};
    use fg_tool::{approval_rule_violation, ErrorCode};

    fn tool_with(snapshot: FleetSnapshot) -> AcknowledgeAlert {
        AcknowledgeAlert::new(Arc::new(Services::new(
            Arc::new(MemoryStore::new(snapshot)),
            Arc::new(LoggingApprovalGate),
        )))
    }

    #[test]
    fn exemption_satisfies_the_approval_rule() {
        let tool = tool_with(FleetSnapshot::default());
        assert!(approval_rule_violation(&tool).is_none());
    }

    #[tokio::test]
    async fn acknowledging_twice_is_harmless() {
        let tool = tool_with(FleetSnapshot::demo(Utc::now()));
        let ctx = ToolContext::new("oncall");
        let params = json!({"alert_id": "alert-1001"});

        let first = tool.execute(&ctx, params.clone()).await.unwrap();
        let data = first.data().unwrap();
        assert_eq!(data["alert"]["state"], "acknowledged");
        assert_eq!(data["alert"]["acknowledged_by"], "oncall");
        assert_eq!(data["already_acknowledged"], false);

        let second = tool.execute(&ctx, params).await.unwrap();
        assert_eq!(second.data().unwrap()["already_acknowledged"], true);
        assert_eq!(
            second.data().unwrap()["alert"]["acknowledged_at"],
            data["alert"]["acknowledged_at"]
        );
    }

    #[tokio::test]
    async fn concurrent_acknowledgements_report_one_change() {
        let tool = tool_with(FleetSnapshot::demo(Utc::now()));
        let alice = ToolContext::new("alice");
        let bob = ToolContext::new("bob");
        let params = json!({"alert_id": "alert-1001"});

        let (a, b) = tokio::join!(
            tool.execute(&alice, params.clone()),
            tool.execute(&bob, params.clone())
        );
        let flags: Vec<bool> = [a.unwrap(), b.unwrap()]
            .iter()
            .map(|r| r.data().unwrap()["already_acknowledged"].as_bool().unwrap())
            .collect();
        assert_eq!(flags.iter().filter(|already| !**already).count(), 1);
    }

    #[tokio::test]
    async fn resolved_and_missing_alerts() {
        let mut snapshot = FleetSnapshot::demo(Utc::now());
        snapshot.alerts[0].state = AlertState::Resolved;
        let tool = tool_with(snapshot);
        let ctx = ToolContext::new("oncall");

        let resolved = tool
            .execute(&ctx, json!({"alert_id": "alert-1001"}))
            .await
            .unwrap();
        assert_eq!(resolved.error_ref().unwrap().code, ErrorCode::Conflict);

        let missing = tool
            .execute(&ctx, json!({"alert_id": "alert-9"}))
            .await
            .unwrap();
        assert_eq!(missing.error_ref().unwrap().code, ErrorCode::NotFound);
    }
}
