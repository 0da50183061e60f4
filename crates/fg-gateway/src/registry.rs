// registry.rs: The tool registry, the single entry point for invocations.
//
// Built once at start-up, then shared read-only (`Arc<Registry>`) across
// concurrent requests. Every `execute` is timed, logged through `tracing`
// and recorded to each invocation sink, on success and failure paths alike.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use fg_audit::{InvocationEvent, InvocationSink, Outcome};
use fg_tool::{
    approval_rule_violation, RiskLevel, Tool, ToolContext, ToolError, ToolInfo, ToolResult,
    TransportError,
};

use crate::error::RegistryError;

#[derive(Default)]
pub struct Registry {
    tools: HashMap<String, Arc<dyn Tool>>,
    sinks: Vec<Arc<dyn InvocationSink>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Arc<dyn InvocationSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Arc<dyn InvocationSink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// Register `tool`, replacing any tool of the same name.
    ///
    /// A replacement is almost always a wiring mistake, so it is logged.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Some(reason) = approval_rule_violation(tool.as_ref()) {
            tracing::warn!(tool = %name, "registering tool that breaks the approval rule: {}", reason);
        }
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "tool registered twice; previous registration replaced");
        }
    }

    /// Register `tool`, refusing duplicates and tools that break the
    /// approval rule.
    pub fn try_register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        if let Some(reason) = approval_rule_violation(tool.as_ref()) {
            return Err(RegistryError::UnsafeTool { name, reason });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tools whose risk is exactly `risk`, sorted by name.
    pub fn list_by_risk(&self, risk: RiskLevel) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self
            .tools
            .values()
            .filter(|t| t.risk() == risk)
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Catalog descriptors for every tool, sorted by name.
    pub fn tool_info(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo::describe(t.as_ref()))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Approval-rule problems among registered tools.
    pub fn safety_violations(&self) -> Vec<String> {
        let mut problems: Vec<String> = self
            .tools
            .values()
            .filter_map(|t| approval_rule_violation(t.as_ref()))
            .collect();
        problems.sort();
        problems
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke the tool called `name`.
    ///
    /// An unknown name is a business failure (`not_found`), not a transport
    /// error. Whatever the tool returns is passed back unchanged apart from
    /// `metadata.duration_ms`, which is filled in when the tool left it unset.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        name: &str,
        params: serde_json::Value,
    ) -> Result<ToolResult, TransportError> {
        let started = Instant::now();
        let event = InvocationEvent::new(ctx.request_id, ctx.actor.clone(), name).with_params(&params);

        let Some(tool) = self.get(name) else {
            let elapsed = elapsed_ms(started);
            tracing::warn!(
                tool = name,
                request_id = %ctx.request_id,
                actor = %ctx.actor,
                "unknown tool"
            );
            self.record(
                event
                    .with_duration_ms(elapsed)
                    .with_outcome(Outcome::UnknownTool),
            );
            return Ok(ToolResult::error(ToolError::not_found("tool", name)).with_duration_ms(elapsed));
        };

        let result = tool.execute(ctx, params).await;
        let elapsed = elapsed_ms(started);
        let result = result.map(|r| r.with_duration_ms(elapsed));
        let outcome = Outcome::of(&result);

        tracing::info!(
            tool = name,
            risk = %tool.risk(),
            scope = %tool.scope(),
            duration_ms = elapsed,
            outcome = %outcome,
            request_id = %ctx.request_id,
            actor = %ctx.actor,
            "tool invoked"
        );
        self.record(
            event
                .with_safety(tool.risk(), tool.scope(), tool.requires_approval())
                .with_duration_ms(elapsed)
                .with_outcome(outcome),
        );
        result
    }

    fn record(&self, event: InvocationEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(event.clone()) {
                tracing::warn!(tool = %event.tool, "invocation sink error: {}", e);
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fg_audit::MemorySink;
    use fg_tool::{ErrorCode, ParamSchema, Scope};
    use serde_json::json;

    struct Fixed {
        name: &'static str,
        risk: RiskLevel,
        approval: bool,
        fail: bool,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "fixed answer"
        }
        fn parameters(&self) -> ParamSchema {
            ParamSchema::object()
        }
        fn risk(&self) -> RiskLevel {
            self.risk
        }
        fn scope(&self) -> Scope {
            Scope::Environment
        }
        fn idempotent(&self) -> bool {
            true
        }
        fn requires_approval(&self) -> bool {
            self.approval
        }
        async fn execute(
            &self,
            _ctx: &ToolContext,
            _params: serde_json::Value,
        ) -> Result<ToolResult, TransportError> {
            if self.fail {
                Err(TransportError::backend("store unreachable"))
            } else {
                Ok(ToolResult::success(json!({"answer": 42})))
            }
        }
    }

    fn tool(name: &'static str, risk: RiskLevel) -> Arc<dyn Tool> {
        Arc::new(Fixed {
            name,
            risk,
            approval: risk.is_state_change(),
            fail: false,
        })
    }

    #[test]
    fn register_overwrites_and_try_register_refuses() {
        let mut registry = Registry::new();
        registry.register(tool("a", RiskLevel::ReadOnly));
        registry.register(tool("a", RiskLevel::PlanOnly));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().risk(), RiskLevel::PlanOnly);

        let err = registry.try_register(tool("a", RiskLevel::ReadOnly)).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(ref n) if n == "a"));
    }

    #[test]
    fn try_register_refuses_unapproved_state_change() {
        let mut registry = Registry::new();
        let unsafe_tool = Arc::new(Fixed {
            name: "wipe",
            risk: RiskLevel::StateChangeProd,
            approval: false,
            fail: false,
        });
        assert!(matches!(
            registry.try_register(unsafe_tool.clone()),
            Err(RegistryError::UnsafeTool { .. })
        ));
        registry.register(unsafe_tool);
        assert_eq!(registry.safety_violations().len(), 1);
    }

    #[test]
    fn listing_is_sorted_and_exact() {
        let mut registry = Registry::new();
        registry.register(tool("zeta", RiskLevel::ReadOnly));
        registry.register(tool("alpha", RiskLevel::ReadOnly));
        registry.register(tool("plan", RiskLevel::PlanOnly));
        registry.register(tool("change", RiskLevel::StateChangeNonprod));

        assert_eq!(registry.list(), vec!["alpha", "change", "plan", "zeta"]);
        let read_only: Vec<String> = registry
            .list_by_risk(RiskLevel::ReadOnly)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(read_only, vec!["alpha", "zeta"]);
        assert!(registry.list_by_risk(RiskLevel::StateChangeProd).is_empty());
        assert_eq!(registry.tool_info()[0].name, "alpha");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found_and_recorded() {
        let sink = Arc::new(MemorySink::new());
        let registry = Registry::new().with_sink(sink.clone());
        let ctx = ToolContext::new("tester");

        let result = registry.execute(&ctx, "nope", json!({})).await.unwrap();
        assert!(!result.is_success());
        assert_eq!(result.error_ref().unwrap().code, ErrorCode::NotFound);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, Outcome::UnknownTool);
        assert_eq!(events[0].request_id, ctx.request_id);
    }

    #[tokio::test]
    async fn execute_fills_duration_and_records_safety() {
        let sink = Arc::new(MemorySink::new());
        let mut registry = Registry::new().with_sink(sink.clone());
        registry.register(tool("plan", RiskLevel::PlanOnly));

        let result = registry
            .execute(&ToolContext::new("tester"), "plan", json!({}))
            .await
            .unwrap();
        assert!(result.is_success());
        assert!(result.metadata().unwrap().duration_ms.is_some());

        let events = sink.events();
        assert_eq!(events[0].risk, Some(RiskLevel::PlanOnly));
        assert_eq!(events[0].scope, Some(Scope::Environment));
        assert_eq!(events[0].outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn transport_errors_are_forwarded_and_recorded() {
        let sink = Arc::new(MemorySink::new());
        let mut registry = Registry::new().with_sink(sink.clone());
        registry.register(Arc::new(Fixed {
            name: "flaky",
            risk: RiskLevel::ReadOnly,
            approval: false,
            fail: true,
        }));

        let err = registry
            .execute(&ToolContext::new("tester"), "flaky", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Backend { .. }));
        assert!(matches!(
            sink.events()[0].outcome,
            Outcome::TransportError { .. }
        ));
    }
}
