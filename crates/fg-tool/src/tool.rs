// tool.rs: The capability contract every tool implements.
//
// A tool is a named, schema-described unit of work an agent may invoke.
// Besides `execute`, it reports four safety attributes (risk, scope,
// idempotency, approval requirement) through pure getters so the registry
// can enforce and record them uniformly.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::ToolContext;
use crate::error::{ToolError, TransportError};
use crate::result::ToolResult;
use crate::risk::{RiskLevel, Scope};
use crate::schema::ParamSchema;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, stable name within a registry.
    fn name(&self) -> &str;

    /// Human-readable description for the agent's tool menu.
    fn description(&self) -> &str;

    fn parameters(&self) -> ParamSchema;

    fn risk(&self) -> RiskLevel;

    fn scope(&self) -> Scope;

    /// Re-running with the same params has no effect beyond the first
    /// successful application.
    fn idempotent(&self) -> bool;

    /// Invocations become proposals that a human must approve.
    fn requires_approval(&self) -> bool;

    /// Marks a state-changing tool as a documented low-stakes exception to
    /// the approval rule (idempotent and reversible, e.g. acknowledging an
    /// alert). Anything else returning true is a defect.
    fn approval_exempt(&self) -> bool {
        false
    }

    /// Run the tool.
    ///
    /// `Err` is reserved for transport failures (cancelled request, backend
    /// unreachable, serialization). Business failures such as bad params or
    /// a missing target come back as `Ok` with a failed [`ToolResult`].
    async fn execute(
        &self,
        ctx: &ToolContext,
        params: serde_json::Value,
    ) -> Result<ToolResult, TransportError>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name())
            .field("risk", &self.risk())
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

/// Catalog descriptor for one tool (what the agent sees in its menu).
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub risk: RiskLevel,
    pub scope: Scope,
    pub idempotent: bool,
    pub requires_approval: bool,
    pub parameters: ParamSchema,
}

impl ToolInfo {
    pub fn describe(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            risk: tool.risk(),
            scope: tool.scope(),
            idempotent: tool.idempotent(),
            requires_approval: tool.requires_approval(),
            parameters: tool.parameters(),
        }
    }
}

/// Check a tool's safety attributes against the approval rule.
///
/// State-changing tools must require approval unless exempt, and only
/// state-changing tools may require it. Returns a description of the
/// problem, if any.
pub fn approval_rule_violation(tool: &dyn Tool) -> Option<String> {
    let risk = tool.risk();
    if risk.is_state_change() && !tool.requires_approval() && !tool.approval_exempt() {
        return Some(format!(
            "tool '{}' is {} but does not require approval",
            tool.name(),
            risk
        ));
    }
    if !risk.is_state_change() && tool.requires_approval() {
        return Some(format!(
            "tool '{}' is {} and must not require approval",
            tool.name(),
            risk
        ));
    }
    if tool.approval_exempt() && !tool.idempotent() {
        return Some(format!(
            "tool '{}' claims an approval exemption but is not idempotent",
            tool.name()
        ));
    }
    None
}

/// Validate `params` against `schema`, then deserialize into `T`.
///
/// Both failure modes become `invalid_input` with enough detail to fix the
/// call without reading logs.
pub fn parse_params<T>(schema: &ParamSchema, params: serde_json::Value) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    // Agents sometimes send null for "no arguments".
    let params = if params.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        params
    };
    if let Err(violations) = schema.validate(&params) {
        return Err(
            ToolError::invalid_input(format!("{} parameter problem(s)", violations.len()))
                .with_details(serde_json::json!({ "violations": violations })),
        );
    }
    serde_json::from_value(params).map_err(|e| {
        ToolError::invalid_input(format!("malformed parameters: {}", e))
            .with_details(serde_json::json!({ "reason": e.to_string() }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde::Deserialize;
    use serde_json::json;

    struct Probe {
        risk: RiskLevel,
        approval: bool,
        exempt: bool,
        idempotent: bool,
    }

    #[async_trait]
    impl Tool for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters(&self) -> ParamSchema {
            ParamSchema::object()
        }
        fn risk(&self) -> RiskLevel {
            self.risk
        }
        fn scope(&self) -> Scope {
            Scope::Asset
        }
        fn idempotent(&self) -> bool {
            self.idempotent
        }
        fn requires_approval(&self) -> bool {
            self.approval
        }
        fn approval_exempt(&self) -> bool {
            self.exempt
        }
        async fn execute(
            &self,
            _ctx: &ToolContext,
            _params: serde_json::Value,
        ) -> Result<ToolResult, TransportError> {
            Ok(ToolResult::success(json!(null)))
        }
    }

    fn probe(risk: RiskLevel, approval: bool, exempt: bool, idempotent: bool) -> Probe {
        Probe {
            risk,
            approval,
            exempt,
            idempotent,
        }
    }

    #[test]
    fn approval_rule() {
        assert!(approval_rule_violation(&probe(RiskLevel::ReadOnly, false, false, true)).is_none());
        assert!(
            approval_rule_violation(&probe(RiskLevel::StateChangeProd, true, false, false))
                .is_none()
        );
        // Unapproved prod change.
        assert!(
            approval_rule_violation(&probe(RiskLevel::StateChangeProd, false, false, false))
                .is_some()
        );
        // Documented exemption.
        assert!(
            approval_rule_violation(&probe(RiskLevel::StateChangeNonprod, false, true, true))
                .is_none()
        );
        // Exemption without idempotency.
        assert!(
            approval_rule_violation(&probe(RiskLevel::StateChangeNonprod, false, true, false))
                .is_some()
        );
        // Approval on a read-only tool.
        assert!(approval_rule_violation(&probe(RiskLevel::ReadOnly, true, false, true)).is_some());
    }

    #[test]
    fn tool_info_renders_schema() {
        let info = ToolInfo::describe(&probe(RiskLevel::PlanOnly, false, false, true));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["risk"], "plan_only");
        assert_eq!(json["parameters"]["type"], "object");
    }

    #[derive(Debug, Deserialize)]
    struct Params {
        family: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    fn schema() -> ParamSchema {
        ParamSchema::object()
            .property("family", ParamSchema::string(), true)
            .property("limit", ParamSchema::integer().int_range(Some(1), None), false)
    }

    #[test]
    fn parse_params_accepts_valid_input() {
        let params: Params = parse_params(&schema(), json!({"family": "ubuntu-22"})).unwrap();
        assert_eq!(params.family, "ubuntu-22");
        assert!(params.limit.is_none());
    }

    #[test]
    fn parse_params_reports_violations() {
        let err = parse_params::<Params>(&schema(), json!({"limit": 0})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(!err.retryable);
        let violations = err.details.unwrap()["violations"].as_array().unwrap().len();
        assert_eq!(violations, 2);
    }

    #[test]
    fn parse_params_treats_null_as_empty_object() {
        let err = parse_params::<Params>(&schema(), serde_json::Value::Null).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }
}
