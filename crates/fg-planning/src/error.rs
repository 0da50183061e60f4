// error.rs: Error types for the planning algorithms.

use thiserror::Error;

/// Errors returned when planning inputs cannot produce a valid plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    /// An input value is out of range or otherwise unusable.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// A plan must contain at least one phase.
    #[error("plan has no phases")]
    EmptyPlan,

    /// The rollout needs more waves than the caller allows.
    #[error("rollout needs {waves} waves but the limit is {limit}")]
    TooManyWaves { waves: u64, limit: u32 },

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("unknown change type '{0}'")]
    UnknownChangeType(String),
}

impl PlanningError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PlanningError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the offending input, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            PlanningError::InvalidInput { field, .. } => Some(field),
            PlanningError::TooManyWaves { .. } => Some("max_waves"),
            PlanningError::UnknownEnvironment(_) => Some("environment"),
            PlanningError::UnknownChangeType(_) => Some("change_type"),
            PlanningError::EmptyPlan => None,
        }
    }
}
