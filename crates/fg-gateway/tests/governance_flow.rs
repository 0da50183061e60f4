// End-to-end flows through the registry: catalog safety, audit trail,
// cancellation and the plan -> proposal -> decision path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fg_approval::{ApprovalDecision, LoggingApprovalGate, ProposalState};
use fg_audit::{AuditLog, AuditSink, MemorySink, Outcome};
use fg_gateway::{register_all, Registry, Services};
use fg_store::{FleetSnapshot, MemoryStore, Persistence};
use fg_tool::{ErrorCode, RiskLevel, ToolContext, TransportError};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn registry_over(store: Arc<MemoryStore>) -> (Registry, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let mut registry = Registry::new().with_sink(sink.clone());
    let services = Arc::new(Services::new(store, Arc::new(LoggingApprovalGate)));
    register_all(&mut registry, services, true).unwrap();
    (registry, sink)
}

fn demo_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(FleetSnapshot::demo(Utc::now())))
}

#[test]
fn catalog_is_complete_and_safe() {
    let (registry, _) = registry_over(demo_store());
    assert_eq!(registry.len(), 14);
    assert!(registry.safety_violations().is_empty());

    let names = |risk: RiskLevel| -> Vec<String> {
        registry
            .list_by_risk(risk)
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    };
    assert_eq!(
        names(RiskLevel::ReadOnly),
        vec![
            "get_certificate",
            "get_compliance_summary",
            "get_drift_report",
            "get_latest_image",
            "query_assets"
        ]
    );
    assert_eq!(
        names(RiskLevel::PlanOnly),
        vec![
            "assess_risk",
            "generate_patch_plan",
            "simulate_dr_failover",
            "simulate_rollout"
        ]
    );
    assert_eq!(
        names(RiskLevel::StateChangeNonprod),
        vec!["acknowledge_alert", "propose_image_build"]
    );
    assert_eq!(names(RiskLevel::StateChangeProd).len(), 3);

    for info in registry.tool_info() {
        let state_change = info.risk == RiskLevel::StateChangeProd
            || info.risk == RiskLevel::StateChangeNonprod;
        if !state_change {
            assert!(!info.requires_approval, "{} must not need approval", info.name);
        } else if info.name != "acknowledge_alert" {
            assert!(info.requires_approval, "{} must need approval", info.name);
        }
    }
}

#[test]
fn strict_registration_refuses_a_second_catalog() {
    let store = demo_store();
    let (mut registry, _) = registry_over(store.clone());
    let services = Arc::new(Services::new(store, Arc::new(LoggingApprovalGate)));
    assert!(register_all(&mut registry, services.clone(), true).is_err());
    // Lenient registration replaces instead.
    register_all(&mut registry, services, false).unwrap();
    assert_eq!(registry.len(), 14);
}

#[tokio::test]
async fn read_only_tools_answer_the_same_twice() {
    let (registry, _) = registry_over(demo_store());
    let ctx = ToolContext::new("agent");
    let params = json!({"environment": "staging", "limit": 5});

    let first = registry.execute(&ctx, "query_assets", params.clone()).await.unwrap();
    let second = registry.execute(&ctx, "query_assets", params).await.unwrap();
    assert_eq!(first.data(), second.data());
}

#[tokio::test]
async fn unknown_tool_and_bad_params_are_business_failures() {
    let (registry, sink) = registry_over(demo_store());
    let ctx = ToolContext::new("agent");

    let unknown = registry.execute(&ctx, "reboot_everything", json!({})).await.unwrap();
    assert_eq!(unknown.error_ref().unwrap().code, ErrorCode::NotFound);

    let bad = registry
        .execute(&ctx, "get_drift_report", json!({"environment": "qa", "extra": 1}))
        .await
        .unwrap();
    let err = bad.error_ref().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert!(!err.retryable);

    let events = sink.events();
    assert_eq!(events[0].outcome, Outcome::UnknownTool);
    assert_eq!(
        events[1].outcome,
        Outcome::ToolError {
            code: ErrorCode::InvalidInput
        }
    );
}

#[tokio::test]
async fn cancelled_request_is_a_transport_error() {
    let (registry, sink) = registry_over(demo_store());
    let token = CancellationToken::new();
    let ctx = ToolContext::new("agent").with_cancellation(token.clone());
    token.cancel();

    let err = registry
        .execute(&ctx, "get_compliance_summary", json!({"environment": "production"}))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Cancelled));
    assert!(matches!(sink.events()[0].outcome, Outcome::TransportError { .. }));
}

#[tokio::test]
async fn slow_store_hits_the_deadline() {
    let store = Arc::new(
        MemoryStore::new(FleetSnapshot::demo(Utc::now())).with_latency(Duration::from_millis(500)),
    );
    let (registry, _) = registry_over(store);
    let ctx = ToolContext::new("agent").with_timeout(Duration::from_millis(20));

    let result = registry
        .execute(&ctx, "get_latest_image", json!({"family": "ubuntu-22-base"}))
        .await
        .unwrap();
    let err = result.error_ref().unwrap();
    assert_eq!(err.code, ErrorCode::Timeout);
    assert!(err.retryable);
    assert!(result.metadata().unwrap().duration_ms.is_some());
}

#[tokio::test]
async fn offline_store_is_forwarded_not_wrapped() {
    let store = demo_store();
    let (registry, _) = registry_over(store.clone());
    store.set_offline(true);

    let err = registry
        .execute(&ToolContext::new("agent"), "query_assets", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Backend { .. }));
}

#[tokio::test]
async fn plan_then_propose_then_decide() {
    let store = demo_store();
    let (registry, _) = registry_over(store.clone());
    let ctx = ToolContext::new("sre-bot");

    let plan = registry
        .execute(
            &ctx,
            "generate_patch_plan",
            json!({"environment": "production", "canary_percent": 10}),
        )
        .await
        .unwrap();
    assert!(plan.is_success(), "{:?}", plan.error_ref());
    let plan_id = plan.data().unwrap()["plan_id"].as_str().unwrap().to_string();

    let proposed = registry
        .execute(&ctx, "propose_patch_rollout", json!({"plan_id": plan_id}))
        .await
        .unwrap();
    let data = proposed.data().unwrap();
    assert_eq!(data["state"], "pending_approval");
    assert_eq!(data["risk"]["band"], "critical");
    let proposal_id: Uuid = serde_json::from_value(data["proposal_id"].clone()).unwrap();

    // One open proposal per plan.
    let again = registry
        .execute(&ctx, "propose_patch_rollout", json!({"plan_id": plan_id}))
        .await
        .unwrap();
    assert_eq!(again.error_ref().unwrap().code, ErrorCode::Conflict);

    let decided = store
        .decide_proposal(proposal_id, ApprovalDecision::approve("change-board"))
        .await
        .unwrap();
    assert_eq!(
        decided.state,
        ProposalState::Approved {
            approved_by: "change-board".into()
        }
    );
}

#[tokio::test]
async fn rotation_conflicts_until_the_first_is_rejected() {
    let store = demo_store();
    let (registry, _) = registry_over(store.clone());
    let ctx = ToolContext::new("sre-bot");
    let params = json!({"certificate_id": "cert-web-prod"});

    let first = registry
        .execute(&ctx, "propose_certificate_rotation", params.clone())
        .await
        .unwrap();
    let proposal_id: Uuid =
        serde_json::from_value(first.data().unwrap()["proposal_id"].clone()).unwrap();

    let blocked = registry
        .execute(&ctx, "propose_certificate_rotation", params.clone())
        .await
        .unwrap();
    assert_eq!(blocked.error_ref().unwrap().code, ErrorCode::Conflict);

    store
        .decide_proposal(proposal_id, ApprovalDecision::reject("change-board", "wrong window"))
        .await
        .unwrap();
    let retried = registry
        .execute(&ctx, "propose_certificate_rotation", params)
        .await
        .unwrap();
    assert!(retried.is_success());
}

#[tokio::test]
async fn every_invocation_lands_in_a_verifiable_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut registry = Registry::new().with_sink(Arc::new(AuditSink::open(&path).unwrap()));
    register_all(
        &mut registry,
        Arc::new(Services::new(demo_store(), Arc::new(LoggingApprovalGate))),
        true,
    )
    .unwrap();

    let ctx = ToolContext::new("agent");
    registry
        .execute(&ctx, "get_drift_report", json!({"environment": "production"}))
        .await
        .unwrap();
    registry
        .execute(&ctx, "acknowledge_alert", json!({"alert_id": "alert-1001"}))
        .await
        .unwrap();
    registry.execute(&ctx, "no_such_tool", json!({})).await.unwrap();

    assert_eq!(AuditLog::verify_chain(&path).unwrap(), 3);
    let events = AuditLog::read_all(&path).unwrap();
    assert_eq!(events[1].tool, "acknowledge_alert");
    assert_eq!(events[1].risk, Some(RiskLevel::StateChangeNonprod));
    assert!(!events[1].requires_approval);
    assert!(events.iter().all(|e| e.request_id == ctx.request_id));
}
