// risk.rs: Weighted risk scoring for proposed changes.
//
// The score is the sum of per-factor points, capped at 100. Factors are
// emitted in a fixed order so the same input always explains itself the
// same way.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::types::{ChangeType, Environment};

pub const MAX_SCORE: u32 = 100;

pub const CRITICAL_THRESHOLD: u32 = 70;
pub const HIGH_THRESHOLD: u32 = 50;
pub const MEDIUM_THRESHOLD: u32 = 30;

// Weight = the category's maximum points as a share of MAX_SCORE.
const ENVIRONMENT_WEIGHT: f64 = 0.35;
const BLAST_RADIUS_WEIGHT: f64 = 0.30;
const CHANGE_TYPE_WEIGHT: f64 = 0.25;
const HISTORY_WEIGHT: f64 = 0.20;
const DRIFT_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskInput {
    pub environment: Environment,
    pub asset_count: u64,
    pub change_type: ChangeType,
    /// Fraction of recent changes in this scope that failed, in [0, 1].
    #[serde(default)]
    pub recent_failure_rate: Option<f64>,
    /// Assets currently off their expected image.
    #[serde(default)]
    pub drifted_assets: Option<u64>,
}

impl RiskInput {
    pub fn new(environment: Environment, asset_count: u64, change_type: ChangeType) -> Self {
        Self {
            environment,
            asset_count,
            change_type,
            recent_failure_rate: None,
            drifted_assets: None,
        }
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.recent_failure_rate = Some(rate);
        self
    }

    pub fn with_drift(mut self, drifted_assets: u64) -> Self {
        self.drifted_assets = Some(drifted_assets);
        self
    }
}

/// Risk band, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub fn from_score(score: u32) -> Self {
        if score >= CRITICAL_THRESHOLD {
            RiskBand::Critical
        } else if score >= HIGH_THRESHOLD {
            RiskBand::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn requires_approval(self) -> bool {
        self >= RiskBand::High
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBand::Low => write!(f, "low"),
            RiskBand::Medium => write!(f, "medium"),
            RiskBand::High => write!(f, "high"),
            RiskBand::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Environment,
    BlastRadius,
    ChangeType,
    History,
    Drift,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    pub name: String,
    pub category: FactorCategory,
    pub score: u32,
    pub weight: f64,
    pub description: String,
    pub mitigation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskScore {
    pub score: u32,
    pub band: RiskBand,
    pub approval_required: bool,
    pub factors: Vec<RiskFactor>,
}

impl RiskScore {
    pub fn factor(&self, category: FactorCategory) -> Option<&RiskFactor> {
        self.factors.iter().find(|f| f.category == category)
    }
}

fn environment_factor(env: Environment) -> RiskFactor {
    let (score, mitigation) = match env {
        Environment::Production => (35, "schedule inside an approved change window with on-call coverage"),
        Environment::Staging => (15, "confirm staging mirrors production configuration"),
        Environment::Development => (5, "none required"),
    };
    RiskFactor {
        name: "environment".to_string(),
        category: FactorCategory::Environment,
        score,
        weight: ENVIRONMENT_WEIGHT,
        description: format!("change targets the {} environment", env),
        mitigation: mitigation.to_string(),
    }
}

fn blast_radius_score(asset_count: u64) -> u32 {
    match asset_count {
        c if c > 500 => 30,
        c if c > 100 => 20,
        c if c > 20 => 10,
        c if c > 0 => 5,
        _ => 0,
    }
}

fn blast_radius_factor(asset_count: u64) -> RiskFactor {
    let score = blast_radius_score(asset_count);
    let mitigation = if score >= 20 {
        "use smaller waves and a larger canary bake"
    } else if score > 0 {
        "standard canary rollout"
    } else {
        "none required"
    };
    RiskFactor {
        name: "blast_radius".to_string(),
        category: FactorCategory::BlastRadius,
        score,
        weight: BLAST_RADIUS_WEIGHT,
        description: format!("{} assets affected", asset_count),
        mitigation: mitigation.to_string(),
    }
}

fn change_type_factor(change: ChangeType) -> RiskFactor {
    let (score, mitigation) = match change {
        ChangeType::Patch => (15, "verify the patch in staging first"),
        ChangeType::MajorUpgrade => (25, "run the full regression suite and keep the previous image available"),
        ChangeType::ConfigChange => (10, "diff the rendered configuration before applying"),
        ChangeType::Reboot => (20, "drain traffic before rebooting"),
    };
    RiskFactor {
        name: "change_type".to_string(),
        category: FactorCategory::ChangeType,
        score,
        weight: CHANGE_TYPE_WEIGHT,
        description: format!("{} change", change),
        mitigation: mitigation.to_string(),
    }
}

fn history_factor(rate: f64) -> Option<RiskFactor> {
    let score = if rate > 0.20 {
        20
    } else if rate > 0.10 {
        10
    } else if rate > 0.05 {
        5
    } else {
        return None;
    };
    Some(RiskFactor {
        name: "failure_history".to_string(),
        category: FactorCategory::History,
        score,
        weight: HISTORY_WEIGHT,
        description: format!("{:.0}% of recent changes failed", rate * 100.0),
        mitigation: "review recent failures before proceeding".to_string(),
    })
}

fn drift_factor(drifted: u64) -> Option<RiskFactor> {
    let score = match drifted {
        d if d > 50 => 15,
        d if d > 10 => 10,
        d if d > 0 => 5,
        _ => return None,
    };
    Some(RiskFactor {
        name: "drift_volume".to_string(),
        category: FactorCategory::Drift,
        score,
        weight: DRIFT_WEIGHT,
        description: format!("{} assets drifted from their expected image", drifted),
        mitigation: "remediate drift before rolling out".to_string(),
    })
}

/// Score a proposed change.
pub fn score_risk(input: &RiskInput) -> Result<RiskScore, PlanningError> {
    let mut factors = vec![
        environment_factor(input.environment),
        blast_radius_factor(input.asset_count),
        change_type_factor(input.change_type),
    ];

    if let Some(rate) = input.recent_failure_rate {
        if !(rate.is_finite() && (0.0..=1.0).contains(&rate)) {
            return Err(PlanningError::invalid(
                "recent_failure_rate",
                format!("{} is not in [0, 1]", rate),
            ));
        }
        factors.extend(history_factor(rate));
    }
    if let Some(drifted) = input.drifted_assets {
        factors.extend(drift_factor(drifted));
    }

    let score = factors.iter().map(|f| f.score).sum::<u32>().min(MAX_SCORE);
    let band = RiskBand::from_score(score);
    tracing::debug!(score, band = %band, factors = factors.len(), "risk scored");
    Ok(RiskScore {
        score,
        band,
        approval_required: band.requires_approval(),
        factors,
    })
}
