// dr.rs: Disaster-recovery failover readiness simulation.
//
// Starts from a baseline readiness score and applies fixed adjustments for
// replication health, test history, DR pairing and environment. Any
// critical finding makes the failover not ready regardless of score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::types::Environment;

pub const DEFAULT_BASELINE_SCORE: u32 = 85;

const HEALTHY_REPLICATION_BONUS: i32 = 5;
const LAGGING_REPLICATION_PENALTY: i32 = -15;
const BROKEN_REPLICATION_PENALTY: i32 = -40;
const UNTESTED_PENALTY: i32 = -10;
const UNPAIRED_PENALTY: i32 = -20;
const PRODUCTION_PENALTY: i32 = -5;

const BASE_FAILOVER_MINUTES: u32 = 30;
const ASSETS_PER_EXTRA_MINUTE: u64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationStatus {
    Healthy,
    Lagging,
    Broken,
    Unknown,
}

impl fmt::Display for ReplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationStatus::Healthy => write!(f, "healthy"),
            ReplicationStatus::Lagging => write!(f, "lagging"),
            ReplicationStatus::Broken => write!(f, "broken"),
            ReplicationStatus::Unknown => write!(f, "unknown"),
        }
    }
}

fn default_baseline() -> u32 {
    DEFAULT_BASELINE_SCORE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrInput {
    pub environment: Environment,
    pub replication: ReplicationStatus,
    /// A failover test has been run for this pair before.
    pub previously_tested: bool,
    pub dr_pair_configured: bool,
    pub affected_assets: u64,
    #[serde(default = "default_baseline")]
    pub baseline_score: u32,
}

/// Readiness verdict, ordered from best to worst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DrStatus {
    Ready,
    ReadyWithWarnings,
    NotReady,
}

impl fmt::Display for DrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrStatus::Ready => write!(f, "ready"),
            DrStatus::ReadyWithWarnings => write!(f, "ready_with_warnings"),
            DrStatus::NotReady => write!(f, "not_ready"),
        }
    }
}

/// A single change to the readiness score and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreAdjustment {
    pub reason: String,
    pub delta: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrSimulation {
    pub readiness_score: u32,
    pub status: DrStatus,
    pub critical_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub adjustments: Vec<ScoreAdjustment>,
    pub estimated_failover_minutes: u32,
    pub runbook: Vec<String>,
}

impl DrSimulation {
    pub fn is_ready(&self) -> bool {
        self.status != DrStatus::NotReady
    }
}

pub fn estimated_failover_minutes(affected_assets: u64) -> u32 {
    let extra = u32::try_from(affected_assets / ASSETS_PER_EXTRA_MINUTE).unwrap_or(u32::MAX);
    BASE_FAILOVER_MINUTES.saturating_add(extra)
}

fn runbook(replication: ReplicationStatus) -> Vec<String> {
    let mut steps = vec!["freeze writes on the primary site".to_string()];
    if replication == ReplicationStatus::Lagging {
        steps.push("wait for replication lag to drain to zero".to_string());
    }
    steps.extend(
        [
            "confirm replicas are consistent with the primary",
            "promote DR replicas to primary",
            "repoint DNS and load balancers to the DR site",
            "run smoke tests against the DR site",
            "announce failover complete and open the post-failover review",
        ]
        .map(String::from),
    );
    steps
}

/// Simulate a failover and judge its readiness.
pub fn simulate_dr_failover(input: &DrInput) -> Result<DrSimulation, PlanningError> {
    if input.baseline_score > 100 {
        return Err(PlanningError::invalid(
            "baseline_score",
            format!("{} is above 100", input.baseline_score),
        ));
    }

    let mut adjustments = Vec::new();
    let mut warnings = Vec::new();
    let mut critical_issues = Vec::new();
    let mut adjust = |reason: &str, delta: i32| {
        adjustments.push(ScoreAdjustment {
            reason: reason.to_string(),
            delta,
        })
    };

    match input.replication {
        ReplicationStatus::Healthy => adjust("replication healthy", HEALTHY_REPLICATION_BONUS),
        ReplicationStatus::Lagging => {
            adjust("replication lagging", LAGGING_REPLICATION_PENALTY);
            warnings.push("replication is lagging; failover may lose recent writes".to_string());
        }
        ReplicationStatus::Broken => {
            adjust("replication broken", BROKEN_REPLICATION_PENALTY);
            critical_issues.push("replication is broken; the DR site is not receiving data".to_string());
        }
        ReplicationStatus::Unknown => {
            warnings.push("replication status is unknown".to_string());
        }
    }
    if !input.previously_tested {
        adjust("no previous failover test", UNTESTED_PENALTY);
        warnings.push("failover has never been tested for this pair".to_string());
    }
    if !input.dr_pair_configured {
        adjust("no DR pair configured", UNPAIRED_PENALTY);
        warnings.push("no DR pair is configured".to_string());
    }
    if input.environment.is_production() {
        adjust("production environment", PRODUCTION_PENALTY);
    }

    let raw = input.baseline_score as i32 + adjustments.iter().map(|a| a.delta).sum::<i32>();
    let readiness_score = raw.clamp(0, 100) as u32;

    let status = if !critical_issues.is_empty() {
        DrStatus::NotReady
    } else if !warnings.is_empty() {
        DrStatus::ReadyWithWarnings
    } else {
        DrStatus::Ready
    };

    tracing::debug!(
        environment = %input.environment,
        replication = %input.replication,
        score = readiness_score,
        status = %status,
        "dr failover simulated"
    );

    Ok(DrSimulation {
        readiness_score,
        status,
        critical_issues,
        warnings,
        adjustments,
        estimated_failover_minutes: estimated_failover_minutes(input.affected_assets),
        runbook: runbook(input.replication),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(env: Environment, replication: ReplicationStatus) -> DrInput {
        DrInput {
            environment: env,
            replication,
            previously_tested: true,
            dr_pair_configured: true,
            affected_assets: 120,
            baseline_score: DEFAULT_BASELINE_SCORE,
        }
    }

    #[test]
    fn healthy_staging_is_ready() {
        let sim = simulate_dr_failover(&input(Environment::Staging, ReplicationStatus::Healthy)).unwrap();
        assert_eq!(sim.readiness_score, 90);
        assert_eq!(sim.status, DrStatus::Ready);
        assert_eq!(sim.estimated_failover_minutes, 42);
    }

    #[test]
    fn broken_replication_is_never_ready() {
        let mut i = input(Environment::Development, ReplicationStatus::Broken);
        i.baseline_score = 100;
        let sim = simulate_dr_failover(&i).unwrap();
        assert_eq!(sim.readiness_score, 60);
        assert_eq!(sim.status, DrStatus::NotReady);
        assert!(!sim.is_ready());
        assert_eq!(sim.critical_issues.len(), 1);
    }

    #[test]
    fn lagging_untested_unpaired_production() {
        let mut i = input(Environment::Production, ReplicationStatus::Lagging);
        i.previously_tested = false;
        i.dr_pair_configured = false;
        let sim = simulate_dr_failover(&i).unwrap();
        // 85 - 15 - 10 - 20 - 5
        assert_eq!(sim.readiness_score, 35);
        assert_eq!(sim.status, DrStatus::ReadyWithWarnings);
        assert_eq!(sim.warnings.len(), 3);
        assert!(sim.runbook.iter().any(|s| s.contains("lag")));
    }

    #[test]
    fn unknown_replication_warns_without_moving_score() {
        let sim = simulate_dr_failover(&input(Environment::Staging, ReplicationStatus::Unknown)).unwrap();
        assert_eq!(sim.readiness_score, DEFAULT_BASELINE_SCORE);
        assert_eq!(sim.status, DrStatus::ReadyWithWarnings);
        assert!(sim.adjustments.is_empty());
    }

    #[test]
    fn score_clamps_at_zero() {
        let mut i = input(Environment::Production, ReplicationStatus::Broken);
        i.baseline_score = 10;
        i.previously_tested = false;
        let sim = simulate_dr_failover(&i).unwrap();
        assert_eq!(sim.readiness_score, 0);
    }

    #[test]
    fn baseline_above_100_is_invalid() {
        let mut i = input(Environment::Staging, ReplicationStatus::Healthy);
        i.baseline_score = 101;
        assert!(simulate_dr_failover(&i).is_err());
    }

    #[test]
    fn status_orders_by_severity() {
        assert!(DrStatus::Ready < DrStatus::ReadyWithWarnings);
        assert!(DrStatus::ReadyWithWarnings < DrStatus::NotReady);
    }
}
