// tools/mod.rs: The fleet governance tools and their shared plumbing.
//
// Each tool is a small struct holding `Arc<Services>`. Tool bodies work in
// terms of `Fault`, which splits every failure into a business error (goes
// into the result envelope) or a transport error (forwarded to the caller).

use std::future::Future;
use std::sync::Arc;

use fg_approval::{ApprovalError, ApprovalGate};
use fg_planning::{ChangeType, Environment, PlanningError};
use fg_store::{FleetStore, StoreError};
use fg_tool::{Interrupt, ParamSchema, Tool, ToolContext, ToolError, ToolResult, TransportError};
use serde_json::json;
use uuid::Uuid;

use crate::config::PlanningConfig;
use crate::error::RegistryError;
use crate::registry::Registry;

pub mod alerts;
pub mod inventory;
pub mod planning;
pub mod posture;
pub mod proposals;

pub use alerts::AcknowledgeAlert;
pub use inventory::{GetCertificate, GetLatestImage, QueryAssets};
pub use planning::{AssessRisk, GeneratePatchPlan, SimulateDrFailover, SimulateRollout};
pub use posture::{GetComplianceSummary, GetDriftReport};
pub use proposals::{
    ProposeCertificateRotation, ProposeDrFailover, ProposeImageBuild, ProposePatchRollout,
};

/// Collaborators shared by every tool.
pub struct Services {
    pub store: Arc<dyn FleetStore>,
    pub gate: Arc<dyn ApprovalGate>,
    /// Defaults for planning params the caller leaves unset.
    pub planning: PlanningConfig,
}

impl Services {
    pub fn new(store: Arc<dyn FleetStore>, gate: Arc<dyn ApprovalGate>) -> Self {
        Self {
            store,
            gate,
            planning: PlanningConfig::default(),
        }
    }

    pub fn with_planning(mut self, planning: PlanningConfig) -> Self {
        self.planning = planning;
        self
    }
}

/// Every fleet governance tool, wired to `services`.
pub fn all(services: Arc<Services>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(QueryAssets::new(services.clone())),
        Arc::new(GetLatestImage::new(services.clone())),
        Arc::new(GetCertificate::new(services.clone())),
        Arc::new(GetComplianceSummary::new(services.clone())),
        Arc::new(GetDriftReport::new(services.clone())),
        Arc::new(GeneratePatchPlan::new(services.clone())),
        Arc::new(AssessRisk::new(services.clone())),
        Arc::new(SimulateDrFailover::new(services.clone())),
        Arc::new(SimulateRollout::new(services.clone())),
        Arc::new(ProposeCertificateRotation::new(services.clone())),
        Arc::new(ProposeImageBuild::new(services.clone())),
        Arc::new(ProposePatchRollout::new(services.clone())),
        Arc::new(ProposeDrFailover::new(services.clone())),
        Arc::new(AcknowledgeAlert::new(services)),
    ]
}

/// Register every tool. `strict` refuses duplicates and unsafe tools
/// instead of logging them.
pub fn register_all(
    registry: &mut Registry,
    services: Arc<Services>,
    strict: bool,
) -> Result<(), RegistryError> {
    for tool in all(services) {
        if strict {
            registry.try_register(tool)?;
        } else {
            registry.register(tool);
        }
    }
    Ok(())
}

/// Failure inside a tool body.
#[derive(Debug)]
pub(crate) enum Fault {
    Tool(ToolError),
    Transport(TransportError),
}

impl From<ToolError> for Fault {
    fn from(e: ToolError) -> Self {
        Fault::Tool(e)
    }
}

impl From<TransportError> for Fault {
    fn from(e: TransportError) -> Self {
        Fault::Transport(e)
    }
}

impl From<serde_json::Error> for Fault {
    fn from(e: serde_json::Error) -> Self {
        Fault::Transport(TransportError::Serialization(e))
    }
}

impl From<PlanningError> for Fault {
    fn from(e: PlanningError) -> Self {
        let mut err = ToolError::invalid_input(e.to_string());
        if let Some(field) = e.field() {
            err = err.with_details(json!({ "field": field }));
        }
        Fault::Tool(err)
    }
}

impl From<ApprovalError> for Fault {
    fn from(e: ApprovalError) -> Self {
        Fault::Tool(ToolError::conflict(e.to_string()))
    }
}

impl From<StoreError> for Fault {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => Fault::Tool(ToolError::not_found(kind, &id)),
            StoreError::Conflict(msg) => Fault::Tool(ToolError::conflict(msg)),
            StoreError::Approval(inner) => inner.into(),
            other => Fault::Transport(TransportError::backend(other)),
        }
    }
}

impl From<Interrupt> for Fault {
    fn from(i: Interrupt) -> Self {
        match i {
            Interrupt::Cancelled => Fault::Transport(TransportError::Cancelled),
            Interrupt::DeadlineExceeded => {
                Fault::Tool(ToolError::timeout("deadline exceeded before the store answered"))
            }
        }
    }
}

/// Await a store call under the context's cancellation and deadline.
pub(crate) async fn guarded<F, T, E>(ctx: &ToolContext, fut: F) -> Result<T, Fault>
where
    F: Future<Output = Result<T, E>>,
    Fault: From<E>,
{
    let out = ctx.run(fut).await?;
    Ok(out?)
}

/// Fold a tool body's outcome into the registry contract.
pub(crate) fn finish(outcome: Result<ToolResult, Fault>) -> Result<ToolResult, TransportError> {
    match outcome {
        Ok(result) => Ok(result),
        Err(Fault::Tool(e)) => Ok(ToolResult::error(e)),
        Err(Fault::Transport(e)) => Err(e),
    }
}

pub(crate) fn environment_schema() -> ParamSchema {
    let mut names: Vec<&str> = Environment::ALL.iter().map(|e| e.as_str()).collect();
    names.extend(["prod", "stage", "dev"]);
    ParamSchema::enumeration(names).describe("Target environment")
}

pub(crate) fn change_type_schema() -> ParamSchema {
    let mut names: Vec<&str> = ChangeType::ALL.iter().map(|c| c.as_str()).collect();
    names.extend(["major-upgrade", "config-change"]);
    ParamSchema::enumeration(names).describe("Kind of change; defaults to patch")
}

pub(crate) fn percent_schema(what: &str) -> ParamSchema {
    ParamSchema::number()
        .num_range(Some(0.0), Some(100.0))
        .describe(what)
}

pub(crate) fn parse_uuid(field: &str, s: &str) -> Result<Uuid, ToolError> {
    Uuid::parse_str(s).map_err(|e| {
        ToolError::invalid_input(format!("{} is not a valid UUID: {}", field, e))
            .with_details(json!({ "field": field }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_tool::ErrorCode;

    #[test]
    fn store_errors_split_by_kind() {
        let not_found: Fault = StoreError::NotFound {
            kind: "alert",
            id: "a-1".into(),
        }
        .into();
        assert!(matches!(not_found, Fault::Tool(ref e) if e.code == ErrorCode::NotFound));

        let conflict: Fault = StoreError::Conflict("busy".into()).into();
        assert!(matches!(conflict, Fault::Tool(ref e) if e.code == ErrorCode::Conflict));

        let offline: Fault = StoreError::Unavailable("down".into()).into();
        assert!(matches!(offline, Fault::Transport(TransportError::Backend { .. })));
    }

    #[test]
    fn interrupts_map_to_cancel_and_timeout() {
        assert!(matches!(
            Fault::from(Interrupt::Cancelled),
            Fault::Transport(TransportError::Cancelled)
        ));
        let timeout = Fault::from(Interrupt::DeadlineExceeded);
        assert!(matches!(timeout, Fault::Tool(ref e) if e.code == ErrorCode::Timeout && e.retryable));
    }

    #[test]
    fn planning_errors_name_the_field() {
        let fault: Fault = PlanningError::TooManyWaves { waves: 9, limit: 4 }.into();
        let Fault::Tool(err) = fault else {
            panic!("expected a tool error");
        };
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.details.unwrap()["field"], "max_waves");
    }

    #[test]
    fn finish_keeps_transport_errors_out_of_the_envelope() {
        let ok = finish(Err(Fault::Tool(ToolError::conflict("x")))).unwrap();
        assert!(!ok.is_success());
        assert!(finish(Err(Fault::Transport(TransportError::Cancelled))).is_err());
    }

    #[test]
    fn environment_schema_accepts_aliases() {
        let schema = ParamSchema::object().property("environment", environment_schema(), true);
        assert!(schema.validate(&json!({"environment": "prod"})).is_ok());
        assert!(schema.validate(&json!({"environment": "production"})).is_ok());
        assert!(schema.validate(&json!({"environment": "qa"})).is_err());
    }
}
