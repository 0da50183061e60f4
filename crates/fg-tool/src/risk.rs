// risk.rs: Risk and scope taxonomy for tool invocations.
//
// Every tool declares how dangerous it is (RiskLevel) and how far its
// effects can reach (Scope). Both are ordered so policy code can compare
// them, but registry lookups by risk are always exact matches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of the operation a tool performs, ascending.
///
/// Variant order matters: `#[derive(PartialOrd, Ord)]` compares enum
/// variants in declaration order, so `ReadOnly < PlanOnly < ...`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Queries external state, never mutates anything.
    ReadOnly,
    /// Computes a plan or score; may persist an audit record but never
    /// changes fleet state.
    PlanOnly,
    /// Mutates state outside production.
    StateChangeNonprod,
    /// Mutates production state. Strictest approval requirements.
    StateChangeProd,
}

impl RiskLevel {
    /// All levels in ascending order.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::ReadOnly,
        RiskLevel::PlanOnly,
        RiskLevel::StateChangeNonprod,
        RiskLevel::StateChangeProd,
    ];

    /// True for the two levels that mutate state.
    pub fn is_state_change(self) -> bool {
        matches!(
            self,
            RiskLevel::StateChangeNonprod | RiskLevel::StateChangeProd
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::ReadOnly => "read_only",
            RiskLevel::PlanOnly => "plan_only",
            RiskLevel::StateChangeNonprod => "state_change_nonprod",
            RiskLevel::StateChangeProd => "state_change_prod",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown risk level '{}'", s))
    }
}

/// Maximum blast radius of a single invocation, ascending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// A single asset (one host, one certificate, one alert).
    Asset,
    /// Every asset in one environment.
    Environment,
    /// The whole organization's fleet.
    Organization,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Asset => "asset",
            Scope::Environment => "environment",
            Scope::Organization => "organization",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
