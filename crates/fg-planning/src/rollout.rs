// rollout.rs: What-if simulation of a rollout: plan, risk, timing and failures.

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::estimate::{expected_failures, failure_rate, minutes_per_asset, parallelism};
use crate::patch::{
    generate_patch_plan, PatchPlanInput, DEFAULT_CANARY_PERCENT, DEFAULT_MAX_BATCH_PERCENT,
    WAVE_ERROR_RATE_CEILING,
};
use crate::plan::{PhaseKind, Plan};
use crate::risk::{score_risk, RiskInput, RiskScore};
use crate::types::{ChangeType, Environment};

fn default_canary_percent() -> f64 {
    DEFAULT_CANARY_PERCENT
}

fn default_max_batch_percent() -> f64 {
    DEFAULT_MAX_BATCH_PERCENT
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolloutInput {
    pub environment: Environment,
    pub change_type: ChangeType,
    pub asset_count: u64,
    #[serde(default = "default_canary_percent")]
    pub canary_percent: f64,
    #[serde(default = "default_max_batch_percent")]
    pub max_batch_percent: f64,
}

impl RolloutInput {
    pub fn new(environment: Environment, change_type: ChangeType, asset_count: u64) -> Self {
        Self {
            environment,
            change_type,
            asset_count,
            canary_percent: DEFAULT_CANARY_PERCENT,
            max_batch_percent: DEFAULT_MAX_BATCH_PERCENT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseEstimate {
    pub phase_id: String,
    pub asset_count: u64,
    pub estimated_minutes: u32,
    pub expected_failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolloutSimulation {
    pub plan: Plan,
    pub risk: RiskScore,
    pub minutes_per_asset: u32,
    pub parallelism: u64,
    pub failure_rate: f64,
    pub phase_estimates: Vec<PhaseEstimate>,
    pub estimated_total_minutes: u32,
    pub expected_failures: u64,
    /// Failures within a single wave that abort the rollout.
    pub abort_threshold_failures: u64,
}

impl RolloutSimulation {
    /// The expected failures alone would trip the abort threshold.
    pub fn likely_to_abort(&self) -> bool {
        self.phase_estimates
            .iter()
            .any(|p| p.expected_failures >= self.abort_threshold_failures)
    }
}

pub fn simulate_rollout(input: &RolloutInput) -> Result<RolloutSimulation, PlanningError> {
    let plan = generate_patch_plan(
        &PatchPlanInput::new(input.asset_count, input.environment)
            .with_change_type(input.change_type)
            .with_percentages(input.canary_percent, input.max_batch_percent),
    )?;
    let risk = score_risk(&RiskInput::new(
        input.environment,
        input.asset_count,
        input.change_type,
    ))?;

    let phase_estimates: Vec<PhaseEstimate> = plan
        .phases
        .iter()
        .map(|phase| {
            let touched = matches!(phase.kind, PhaseKind::Canary | PhaseKind::Wave);
            PhaseEstimate {
                phase_id: phase.id.clone(),
                asset_count: phase.asset_count,
                estimated_minutes: phase.estimated_minutes,
                expected_failures: if touched {
                    expected_failures(phase.asset_count, input.change_type)
                } else {
                    0
                },
            }
        })
        .collect();

    let largest_wave = plan
        .waves()
        .map(|p| p.asset_count)
        .max()
        .unwrap_or(input.asset_count);
    let abort_threshold_failures =
        ((largest_wave as f64 * WAVE_ERROR_RATE_CEILING / 100.0).ceil() as u64).max(1);

    Ok(RolloutSimulation {
        estimated_total_minutes: plan.estimated_total_minutes,
        expected_failures: expected_failures(input.asset_count, input.change_type),
        minutes_per_asset: minutes_per_asset(input.change_type),
        parallelism: parallelism(input.environment),
        failure_rate: failure_rate(input.change_type),
        abort_threshold_failures,
        phase_estimates,
        plan,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_upgrade_in_production() {
        let sim = simulate_rollout(&RolloutInput::new(
            Environment::Production,
            ChangeType::MajorUpgrade,
            100,
        ))
        .unwrap();
        assert_eq!(sim.minutes_per_asset, 45);
        assert_eq!(sim.parallelism, 10);
        assert_eq!(sim.expected_failures, 5);
        assert_eq!(sim.phase_estimates.len(), sim.plan.phases.len());
        assert_eq!(sim.estimated_total_minutes, sim.plan.estimated_total_minutes);
        // Largest wave is 20 assets; 2% of 20 rounds up to 1.
        assert_eq!(sim.abort_threshold_failures, 1);
        assert!(sim.likely_to_abort());
    }

    #[test]
    fn validation_phases_expect_no_failures() {
        let sim = simulate_rollout(&RolloutInput::new(
            Environment::Staging,
            ChangeType::Reboot,
            500,
        ))
        .unwrap();
        assert_eq!(sim.phase_estimates[0].expected_failures, 0);
        assert_eq!(sim.phase_estimates.last().unwrap().expected_failures, 0);
        assert_eq!(sim.expected_failures, 10);
        assert_eq!(sim.parallelism, 25);
    }

    #[test]
    fn config_change_in_dev_is_calm() {
        let sim = simulate_rollout(&RolloutInput::new(
            Environment::Development,
            ChangeType::ConfigChange,
            40,
        ))
        .unwrap();
        assert_eq!(sim.expected_failures, 0);
        assert!(!sim.likely_to_abort());
        assert!(!sim.risk.approval_required);
    }

    #[test]
    fn zero_assets_is_invalid() {
        assert!(simulate_rollout(&RolloutInput::new(
            Environment::Development,
            ChangeType::Patch,
            0
        ))
        .is_err());
    }
}
