// plan.rs: Phased plan structure shared by patch plans and rollout simulations.

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::types::{ChangeType, Environment};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    PreflightValidation,
    Canary,
    Wave,
    PostValidation,
}

/// One sequential step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub id: String,
    pub kind: PhaseKind,
    pub name: String,
    pub description: String,
    pub asset_count: u64,
    /// Share of the plan's assets touched in this phase, two decimals.
    pub asset_percent: f64,
    pub estimated_minutes: u32,
    pub success_criteria: Vec<String>,
    /// Whether a failure in this phase triggers the rollback procedure.
    pub rollback_eligible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollbackPlan {
    pub triggers: Vec<String>,
    pub procedure: Vec<String>,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Slack,
    Email,
    #[serde(rename = "pagerduty")]
    PagerDuty,
}

/// Which channels hear about each plan event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationMatrix {
    pub on_start: Vec<Channel>,
    pub on_phase_complete: Vec<Channel>,
    pub on_failure: Vec<Channel>,
    pub on_completion: Vec<Channel>,
}

impl NotificationMatrix {
    /// Escalates with the environment; only production pages on failure.
    pub fn for_environment(env: Environment) -> Self {
        use Channel::*;
        match env {
            Environment::Production => Self {
                on_start: vec![Slack, Email],
                on_phase_complete: vec![Slack],
                on_failure: vec![PagerDuty, Slack, Email],
                on_completion: vec![Slack, Email],
            },
            Environment::Staging => Self {
                on_start: vec![Slack],
                on_phase_complete: vec![Slack],
                on_failure: vec![Slack, Email],
                on_completion: vec![Slack],
            },
            Environment::Development => Self {
                on_start: vec![],
                on_phase_complete: vec![],
                on_failure: vec![Slack],
                on_completion: vec![Slack],
            },
        }
    }

    pub fn pages_on_failure(&self) -> bool {
        self.on_failure.contains(&Channel::PagerDuty)
    }
}

/// A complete phased plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub environment: Environment,
    pub change_type: ChangeType,
    pub total_assets: u64,
    pub phases: Vec<Phase>,
    pub rollback: RollbackPlan,
    pub notifications: NotificationMatrix,
    pub estimated_total_minutes: u32,
}

impl Plan {
    /// Assemble a plan. The total duration is the sum of the phases, which
    /// run strictly one after another.
    pub fn new(
        environment: Environment,
        change_type: ChangeType,
        total_assets: u64,
        phases: Vec<Phase>,
        rollback: RollbackPlan,
    ) -> Result<Self, PlanningError> {
        if phases.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }
        let estimated_total_minutes = phases
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.estimated_minutes));
        Ok(Self {
            environment,
            change_type,
            total_assets,
            phases,
            rollback,
            notifications: NotificationMatrix::for_environment(environment),
            estimated_total_minutes,
        })
    }

    /// Re-check a plan that came from outside (e.g. a persisted record).
    pub fn validate(&self) -> Result<(), PlanningError> {
        if self.phases.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }
        let mut seen = std::collections::HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.id.as_str()) {
                return Err(PlanningError::invalid(
                    "phases",
                    format!("duplicate phase id '{}'", phase.id),
                ));
            }
        }
        Ok(())
    }

    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    pub fn waves(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().filter(|p| p.kind == PhaseKind::Wave)
    }

    pub fn wave_count(&self) -> usize {
        self.waves().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(id: &str, minutes: u32) -> Phase {
        Phase {
            id: id.to_string(),
            kind: PhaseKind::Wave,
            name: id.to_string(),
            description: String::new(),
            asset_count: 1,
            asset_percent: 100.0,
            estimated_minutes: minutes,
            success_criteria: vec![],
            rollback_eligible: true,
        }
    }

    fn rollback() -> RollbackPlan {
        RollbackPlan {
            triggers: vec![],
            procedure: vec![],
            estimated_minutes: 0,
        }
    }

    #[test]
    fn empty_plan_is_rejected() {
        let err = Plan::new(
            Environment::Staging,
            ChangeType::Patch,
            1,
            vec![],
            rollback(),
        )
        .unwrap_err();
        assert_eq!(err, PlanningError::EmptyPlan);
    }

    #[test]
    fn total_is_sum_of_phases() {
        let plan = Plan::new(
            Environment::Staging,
            ChangeType::Patch,
            2,
            vec![phase("wave-1", 20), phase("wave-2", 25)],
            rollback(),
        )
        .unwrap();
        assert_eq!(plan.estimated_total_minutes, 45);
        assert_eq!(plan.wave_count(), 2);
        assert!(plan.phase("wave-2").is_some());
    }

    #[test]
    fn duplicate_phase_ids_fail_validation() {
        let mut plan = Plan::new(
            Environment::Development,
            ChangeType::Reboot,
            1,
            vec![phase("wave-1", 5)],
            rollback(),
        )
        .unwrap();
        plan.phases.push(phase("wave-1", 5));
        assert!(matches!(
            plan.validate(),
            Err(PlanningError::InvalidInput { .. })
        ));
    }

    #[test]
    fn only_production_pages() {
        assert!(NotificationMatrix::for_environment(Environment::Production).pages_on_failure());
        assert!(!NotificationMatrix::for_environment(Environment::Staging).pages_on_failure());
        assert!(!NotificationMatrix::for_environment(Environment::Development).pages_on_failure());
    }
}
