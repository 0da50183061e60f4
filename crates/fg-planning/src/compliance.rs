// compliance.rs: Compliance posture and evidence readiness from control results.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const COMPLIANT_THRESHOLD: f64 = 95.0;
pub const PARTIAL_THRESHOLD: f64 = 80.0;

/// Control severity. Declared most severe first so sorting puts critical
/// failures at the top.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControlSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for ControlSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSeverity::Critical => write!(f, "critical"),
            ControlSeverity::High => write!(f, "high"),
            ControlSeverity::Medium => write!(f, "medium"),
            ControlSeverity::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedControl {
    pub control_id: String,
    pub severity: ControlSeverity,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceCounts {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl ComplianceCounts {
    pub fn evaluated(&self) -> u64 {
        self.passed + self.failed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    NoData,
    Compliant,
    PartiallyCompliant,
    NonCompliant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceAssessment {
    /// Percentage of evaluated controls that passed; skips are excluded.
    /// `None` when nothing was evaluated.
    pub pass_rate: Option<f64>,
    pub status: ComplianceStatus,
    pub counts: ComplianceCounts,
    pub failing_controls: Vec<FailedControl>,
    pub critical_failures: usize,
    /// Evidence can be handed to an auditor as-is.
    pub evidence_ready: bool,
}

pub fn assess_compliance(counts: ComplianceCounts, failures: &[FailedControl]) -> ComplianceAssessment {
    let evaluated = counts.evaluated();
    let exact_rate = (evaluated > 0).then(|| counts.passed as f64 * 100.0 / evaluated as f64);

    // Thresholds apply to the exact rate; only the reported figure is rounded.
    let status = match exact_rate {
        None => ComplianceStatus::NoData,
        Some(rate) if rate >= COMPLIANT_THRESHOLD => ComplianceStatus::Compliant,
        Some(rate) if rate >= PARTIAL_THRESHOLD => ComplianceStatus::PartiallyCompliant,
        Some(_) => ComplianceStatus::NonCompliant,
    };
    let pass_rate = exact_rate.map(|rate| (rate * 100.0).round() / 100.0);

    let mut failing_controls = failures.to_vec();
    failing_controls.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.control_id.cmp(&b.control_id))
    });
    let critical_failures = failing_controls
        .iter()
        .filter(|c| c.severity == ControlSeverity::Critical)
        .count();

    ComplianceAssessment {
        pass_rate,
        evidence_ready: status == ComplianceStatus::Compliant && critical_failures == 0,
        status,
        counts,
        failing_controls,
        critical_failures,
    }
}
