// records.rs: Fleet records as exchanged with the data store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fg_planning::{
    ChangeType, ComplianceCounts, Environment, FailedControl, Phase, Plan, ReplicationStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Running,
    Stopped,
    Terminated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    InSync,
    Drifted,
    Unknown,
}

/// A managed machine in the fleet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub asset_id: String,
    pub hostname: String,
    /// Hosting platform, e.g. `aws`, `azure`, `vsphere`.
    pub platform: String,
    pub region: String,
    pub environment: Environment,
    pub image_family: String,
    pub image_version: String,
    pub state: AssetState,
    pub drift_status: DriftStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Asset selection. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetFilter {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub drift_status: Option<DriftStatus>,
    #[serde(default)]
    pub image_family: Option<String>,
}

impl AssetFilter {
    pub fn environment(env: Environment) -> Self {
        Self {
            environment: Some(env),
            ..Self::default()
        }
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        fn eq_ci(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map_or(true, |w| w.eq_ignore_ascii_case(have))
        }
        eq_ci(&self.platform, &asset.platform)
            && eq_ci(&self.region, &asset.region)
            && eq_ci(&self.image_family, &asset.image_family)
            && self.environment.map_or(true, |e| e == asset.environment)
            && self.drift_status.map_or(true, |d| d == asset.drift_status)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Building,
    Published,
    Deprecated,
}

/// An approved baseline machine image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoldenImage {
    pub image_id: String,
    pub family: String,
    pub version: String,
    pub os: String,
    pub status: ImageStatus,
    pub published_at: DateTime<Utc>,
    /// Benchmarks the image passed at build time, e.g. `cis-level-1`.
    #[serde(default)]
    pub compliance_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub certificate_id: String,
    pub common_name: String,
    pub issuer: String,
    pub environment: Environment,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub key_algorithm: String,
}

impl Certificate {
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now).num_days()
    }
}

/// Where a certificate is in use; the set of bindings is its blast radius.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateBinding {
    pub certificate_id: String,
    pub asset_id: String,
    pub service: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationStatus {
    /// Proposed and waiting on approval.
    Pending,
    InProgress,
    Completed,
    Failed,
    /// The proposal was rejected.
    Cancelled,
}

impl RotationStatus {
    /// A rotation in this state blocks new rotations of the same certificate.
    pub fn in_flight(self) -> bool {
        matches!(self, RotationStatus::Pending | RotationStatus::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotationRecord {
    pub rotation_id: Uuid,
    pub certificate_id: String,
    pub proposal_id: Uuid,
    pub status: RotationStatus,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
}

/// Latest compliance scan results for one environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceReport {
    pub environment: Environment,
    pub counts: ComplianceCounts,
    #[serde(default)]
    pub failures: Vec<FailedControl>,
    pub scanned_at: DateTime<Utc>,
}

/// One asset running something other than its golden baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftDetail {
    pub asset_id: String,
    pub environment: Environment,
    pub image_family: String,
    pub expected_version: String,
    pub actual_version: String,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrPair {
    pub environment: Environment,
    pub primary_region: String,
    pub dr_region: String,
    pub replication: ReplicationStatus,
    #[serde(default)]
    pub last_failover_test: Option<DateTime<Utc>>,
}

/// Recent change outcomes for an environment, used as a risk input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeHistory {
    pub environment: Environment,
    pub recent_changes: u64,
    pub recent_failures: u64,
}

impl ChangeHistory {
    pub fn failure_rate(&self) -> Option<f64> {
        (self.recent_changes > 0).then(|| self.recent_failures as f64 / self.recent_changes as f64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Open,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub alert_id: String,
    pub asset_id: String,
    pub severity: String,
    pub message: String,
    pub state: AlertState,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// A generated plan kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRecord {
    pub plan_id: Uuid,
    pub environment: Environment,
    pub change_type: ChangeType,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub plan: Plan,
}

impl PlanRecord {
    pub fn new(plan: Plan, created_by: impl Into<String>) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            environment: plan.environment,
            change_type: plan.change_type,
            created_by: created_by.into(),
            created_at: Utc::now(),
            plan,
        }
    }

    /// One row per phase, in execution order.
    pub fn phase_rows(&self) -> Vec<PhaseRow> {
        self.plan
            .phases
            .iter()
            .enumerate()
            .map(|(i, phase)| PhaseRow {
                plan_id: self.plan_id,
                sequence: i as u32 + 1,
                phase: phase.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseRow {
    pub plan_id: Uuid,
    pub sequence: u32,
    pub phase: Phase,
}
