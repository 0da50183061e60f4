// event.rs: Invocation audit record.
//
// One InvocationEvent is written per registry Execute call, whatever the
// outcome. Parameters are stored only as a digest so the log never holds
// secrets an agent passed in.

use std::fmt;

use chrono::{DateTime, Utc};
use fg_tool::{ErrorCode, RiskLevel, Scope, ToolResult, TransportError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hasher;

/// How an invocation ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// The tool ran and reported a business failure.
    ToolError { code: ErrorCode },
    /// The call failed below the tool contract (cancelled, backend down).
    TransportError { message: String },
    /// No tool is registered under the requested name.
    UnknownTool,
}

impl Outcome {
    pub fn of(result: &Result<ToolResult, TransportError>) -> Self {
        match result {
            Ok(r) => match r.error_ref() {
                None => Outcome::Success,
                Some(e) => Outcome::ToolError { code: e.code },
            },
            Err(e) => Outcome::TransportError {
                message: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::ToolError { code } => write!(f, "tool_error:{}", code),
            Outcome::TransportError { .. } => write!(f, "transport_error"),
            Outcome::UnknownTool => write!(f, "unknown_tool"),
        }
    }
}

/// One line of the invocation audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,

    /// Request id from the invocation context; ties log lines to traces.
    pub request_id: Uuid,
    pub actor: String,
    pub tool: String,

    /// Safety attributes as declared by the tool. Absent for unknown tools.
    pub risk: Option<RiskLevel>,
    pub scope: Option<Scope>,
    #[serde(default)]
    pub requires_approval: bool,

    pub duration_ms: u64,
    pub outcome: Outcome,

    /// SHA-256 of the compact JSON params.
    pub params_hash: String,

    /// Hash of the previous line in the log; `None` for the first event.
    pub previous_hash: Option<String>,
}

impl InvocationEvent {
    pub fn new(request_id: Uuid, actor: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            request_id,
            actor: actor.into(),
            tool: tool.into(),
            risk: None,
            scope: None,
            requires_approval: false,
            duration_ms: 0,
            outcome: Outcome::UnknownTool,
            params_hash: hasher::hash_json(&serde_json::Value::Null),
            previous_hash: None,
        }
    }

    pub fn with_safety(mut self, risk: RiskLevel, scope: Scope, requires_approval: bool) -> Self {
        self.risk = Some(risk);
        self.scope = Some(scope);
        self.requires_approval = requires_approval;
        self
    }

    pub fn with_params(mut self, params: &serde_json::Value) -> Self {
        self.params_hash = hasher::hash_json(params);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }
}
