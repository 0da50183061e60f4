//! # fg-planning
//!
//! Deterministic planning and scoring for fleet changes.
//!
//! Every function here is pure: no I/O, no clock, no randomness. The same
//! input always yields the same plan, score and explanation, which makes
//! the output safe to attach to an approval proposal and re-derive later.
//!
//! - [`generate_patch_plan`]: pre-flight, canary, waves, post-validation.
//! - [`score_risk`]: weighted factors and a band that decides approval.
//! - [`simulate_dr_failover`]: readiness score and go/no-go status.
//! - [`simulate_rollout`]: plan plus timing and expected failures.
//! - [`assess_compliance`]: posture and evidence readiness.

pub mod compliance;
pub mod dr;
pub mod error;
pub mod estimate;
pub mod patch;
pub mod plan;
pub mod risk;
pub mod rollout;
pub mod types;

pub use compliance::{
    assess_compliance, ComplianceAssessment, ComplianceCounts, ComplianceStatus, ControlSeverity,
    FailedControl,
};
pub use dr::{simulate_dr_failover, DrInput, DrSimulation, DrStatus, ReplicationStatus, ScoreAdjustment};
pub use error::PlanningError;
pub use patch::{generate_patch_plan, size_waves, PatchPlanInput, WaveSizing};
pub use plan::{Channel, NotificationMatrix, Phase, PhaseKind, Plan, RollbackPlan};
pub use risk::{score_risk, FactorCategory, RiskBand, RiskFactor, RiskInput, RiskScore};
pub use rollout::{simulate_rollout, PhaseEstimate, RolloutInput, RolloutSimulation};
pub use types::{ChangeType, Environment};
