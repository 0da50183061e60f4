//! # fg-tool
//!
//! The capability contract for fleet governance tools.
//!
//! Every action an agent can take against the fleet is a [`Tool`] that
//! declares machine-checkable safety metadata ([`RiskLevel`], [`Scope`],
//! idempotency, approval requirement) and a structural [`ParamSchema`].
//! Tools answer with a [`ToolResult`] envelope; business failures travel
//! inside it as a [`ToolError`], infrastructure failures as a
//! [`TransportError`].
//!
//! ## Key invariants
//!
//! - **Result envelope**: `success == true` exactly when no error is set.
//! - **Fixed retry taxonomy**: `invalid_input` is never retryable,
//!   `rate_limited` always is.
//! - **Approval rule**: state-changing tools require approval unless they
//!   carry an explicit exemption (see [`approval_rule_violation`]).

pub mod context;
pub mod error;
pub mod result;
pub mod risk;
pub mod schema;
pub mod tool;

pub use context::{Interrupt, ToolContext};
pub use error::{wrap_error, ErrorCode, ToolError, TransportError};
pub use result::{ResultMetadata, ToolResult};
pub use risk::{RiskLevel, Scope};
pub use schema::{ParamSchema, SchemaViolation};
pub use tool::{approval_rule_violation, parse_params, Tool, ToolInfo};
