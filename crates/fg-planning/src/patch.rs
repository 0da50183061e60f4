// patch.rs: Canary-then-waves patch plan generation.
//
// A rollout always runs pre-flight validation, a canary batch, as many
// waves as the batch size requires, and a post-rollout validation. The
// last wave absorbs whatever the full-sized waves leave over.

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::estimate::{batch_minutes, percent_of};
use crate::plan::{Phase, PhaseKind, Plan, RollbackPlan};
use crate::types::{ChangeType, Environment};

pub const DEFAULT_CANARY_PERCENT: f64 = 5.0;
pub const DEFAULT_MAX_BATCH_PERCENT: f64 = 20.0;

pub const PREFLIGHT_MINUTES: u32 = 15;
/// Soak time after the canary batch before any wave starts.
pub const CANARY_BAKE_MINUTES: u32 = 60;
pub const POST_VALIDATION_MINUTES: u32 = 30;

/// Error-rate ceilings, in percent of the phase's assets.
pub const CANARY_ERROR_RATE_CEILING: f64 = 1.0;
pub const WAVE_ERROR_RATE_CEILING: f64 = 2.0;

fn default_canary_percent() -> f64 {
    DEFAULT_CANARY_PERCENT
}

fn default_max_batch_percent() -> f64 {
    DEFAULT_MAX_BATCH_PERCENT
}

fn default_change_type() -> ChangeType {
    ChangeType::Patch
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchPlanInput {
    pub total_assets: u64,
    pub environment: Environment,
    #[serde(default = "default_change_type")]
    pub change_type: ChangeType,
    #[serde(default = "default_canary_percent")]
    pub canary_percent: f64,
    #[serde(default = "default_max_batch_percent")]
    pub max_batch_percent: f64,
    /// Refuse plans that need more waves than this.
    #[serde(default)]
    pub max_waves: Option<u32>,
}

impl PatchPlanInput {
    pub fn new(total_assets: u64, environment: Environment) -> Self {
        Self {
            total_assets,
            environment,
            change_type: ChangeType::Patch,
            canary_percent: DEFAULT_CANARY_PERCENT,
            max_batch_percent: DEFAULT_MAX_BATCH_PERCENT,
            max_waves: None,
        }
    }

    pub fn with_change_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = change_type;
        self
    }

    pub fn with_percentages(mut self, canary_percent: f64, max_batch_percent: f64) -> Self {
        self.canary_percent = canary_percent;
        self.max_batch_percent = max_batch_percent;
        self
    }

    pub fn with_max_waves(mut self, limit: u32) -> Self {
        self.max_waves = Some(limit);
        self
    }
}

/// Batch sizes derived from the asset count and percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveSizing {
    pub canary_size: u64,
    pub wave_size: u64,
    /// Size of each wave in order; only the last may differ from `wave_size`.
    pub wave_sizes: Vec<u64>,
}

impl WaveSizing {
    pub fn wave_count(&self) -> u64 {
        self.wave_sizes.len() as u64
    }
}

pub(crate) fn check_percent(field: &str, value: f64) -> Result<(), PlanningError> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(PlanningError::invalid(field, format!("{} is not in (0, 100]", value)))
    }
}

/// Compute canary and wave sizes for `total` assets.
pub fn size_waves(
    total: u64,
    canary_percent: f64,
    max_batch_percent: f64,
) -> Result<WaveSizing, PlanningError> {
    if total == 0 {
        return Err(PlanningError::invalid("total_assets", "must be at least 1"));
    }
    check_percent("canary_percent", canary_percent)?;
    check_percent("max_batch_percent", max_batch_percent)?;

    let share = |percent: f64| ((total as f64 * percent / 100.0).round() as u64).max(1);
    let canary_size = share(canary_percent).min(total);
    let wave_size = share(max_batch_percent);
    let remaining = total - canary_size;

    let waves = remaining.div_ceil(wave_size);
    let wave_sizes = (0..waves)
        .map(|i| {
            if i + 1 == waves {
                remaining - i * wave_size
            } else {
                wave_size
            }
        })
        .collect();

    Ok(WaveSizing {
        canary_size,
        wave_size,
        wave_sizes,
    })
}

/// Generate a phased patch plan.
pub fn generate_patch_plan(input: &PatchPlanInput) -> Result<Plan, PlanningError> {
    let sizing = size_waves(input.total_assets, input.canary_percent, input.max_batch_percent)?;
    if let Some(limit) = input.max_waves {
        if sizing.wave_count() > u64::from(limit) {
            return Err(PlanningError::TooManyWaves {
                waves: sizing.wave_count(),
                limit,
            });
        }
    }

    let total = input.total_assets;
    let env = input.environment;
    let change = input.change_type;
    let mut phases = Vec::with_capacity(sizing.wave_sizes.len() + 3);

    phases.push(Phase {
        id: "preflight".to_string(),
        kind: PhaseKind::PreflightValidation,
        name: "Pre-flight validation".to_string(),
        description: format!(
            "Verify readiness of {} {} assets before any change",
            total, env
        ),
        asset_count: total,
        asset_percent: 100.0,
        estimated_minutes: PREFLIGHT_MINUTES,
        success_criteria: vec![
            "all target assets reachable".to_string(),
            "target golden image available in every region".to_string(),
            "no open critical alerts on target assets".to_string(),
        ],
        rollback_eligible: false,
    });

    phases.push(Phase {
        id: "canary".to_string(),
        kind: PhaseKind::Canary,
        name: "Canary".to_string(),
        description: format!(
            "Apply {} to {} canary assets and bake for {} minutes",
            change, sizing.canary_size, CANARY_BAKE_MINUTES
        ),
        asset_count: sizing.canary_size,
        asset_percent: percent_of(sizing.canary_size, total),
        estimated_minutes: batch_minutes(sizing.canary_size, env, change)
            .saturating_add(CANARY_BAKE_MINUTES),
        success_criteria: vec![
            format!("error rate below {}%", CANARY_ERROR_RATE_CEILING),
            "all canary assets pass health checks".to_string(),
            format!("no critical alerts during the {}-minute bake", CANARY_BAKE_MINUTES),
        ],
        rollback_eligible: true,
    });

    for (i, &size) in sizing.wave_sizes.iter().enumerate() {
        let n = i + 1;
        phases.push(Phase {
            id: format!("wave-{}", n),
            kind: PhaseKind::Wave,
            name: format!("Wave {}", n),
            description: format!("Apply {} to {} assets", change, size),
            asset_count: size,
            asset_percent: percent_of(size, total),
            estimated_minutes: batch_minutes(size, env, change),
            success_criteria: vec![
                format!("error rate below {}%", WAVE_ERROR_RATE_CEILING),
                "at least 98% of wave assets pass health checks".to_string(),
            ],
            rollback_eligible: true,
        });
    }

    phases.push(Phase {
        id: "post-validation".to_string(),
        kind: PhaseKind::PostValidation,
        name: "Post-rollout validation".to_string(),
        description: "Confirm fleet health and compliance after the rollout".to_string(),
        asset_count: total,
        asset_percent: 100.0,
        estimated_minutes: POST_VALIDATION_MINUTES,
        success_criteria: vec![
            format!("all {} assets report the target version", total),
            "compliance scan passes".to_string(),
            "no new drift reported".to_string(),
        ],
        rollback_eligible: false,
    });

    let rollback = RollbackPlan {
        triggers: vec![
            format!("canary error rate above {}%", CANARY_ERROR_RATE_CEILING),
            format!("wave error rate above {}%", WAVE_ERROR_RATE_CEILING),
            "critical alert raised on a changed asset".to_string(),
        ],
        procedure: vec![
            "halt all remaining waves".to_string(),
            "revert changed assets to the previous image in reverse wave order".to_string(),
            "re-run health checks on reverted assets".to_string(),
            "open an incident and notify the failure channels".to_string(),
        ],
        estimated_minutes: batch_minutes(total, env, change),
    };

    let plan = Plan::new(env, change, total, phases, rollback)?;
    tracing::debug!(
        environment = %env,
        change_type = %change,
        total_assets = total,
        waves = sizing.wave_count(),
        minutes = plan.estimated_total_minutes,
        "patch plan generated"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_assets_default_percentages() {
        let plan = generate_patch_plan(&PatchPlanInput::new(100, Environment::Production)).unwrap();
        assert_eq!(plan.phases.len(), 8);
        let canary = plan.phase("canary").unwrap();
        assert_eq!(canary.asset_count, 5);
        let waves: Vec<u64> = plan.waves().map(|p| p.asset_count).collect();
        assert_eq!(waves, vec![20, 20, 20, 20, 15]);
        assert_eq!(plan.phases[0].kind, PhaseKind::PreflightValidation);
        assert_eq!(plan.phases[7].kind, PhaseKind::PostValidation);
    }

    #[test]
    fn canary_and_waves_cover_every_asset() {
        for total in [1u64, 2, 7, 19, 100, 101, 999, 2500] {
            let plan = generate_patch_plan(&PatchPlanInput::new(total, Environment::Staging)).unwrap();
            let covered: u64 = plan
                .phases
                .iter()
                .filter(|p| matches!(p.kind, PhaseKind::Canary | PhaseKind::Wave))
                .map(|p| p.asset_count)
                .sum();
            assert_eq!(covered, total, "total {}", total);
        }
    }

    #[test]
    fn single_asset_is_all_canary() {
        let sizing = size_waves(1, 5.0, 20.0).unwrap();
        assert_eq!(sizing.canary_size, 1);
        assert!(sizing.wave_sizes.is_empty());
    }

    #[test]
    fn large_fleets_are_not_capped() {
        // 1000 assets at 1% batches needs 95 waves after a 50-asset canary.
        let input = PatchPlanInput::new(1000, Environment::Production).with_percentages(5.0, 1.0);
        let plan = generate_patch_plan(&input).unwrap();
        assert_eq!(plan.wave_count(), 95);
    }

    #[test]
    fn wave_limit_is_enforced() {
        let input = PatchPlanInput::new(100, Environment::Production).with_max_waves(3);
        let err = generate_patch_plan(&input).unwrap_err();
        assert_eq!(err, PlanningError::TooManyWaves { waves: 5, limit: 3 });
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            size_waves(0, 5.0, 20.0),
            Err(PlanningError::InvalidInput { ref field, .. }) if field == "total_assets"
        ));
        assert!(matches!(
            size_waves(10, 0.0, 20.0),
            Err(PlanningError::InvalidInput { ref field, .. }) if field == "canary_percent"
        ));
        assert!(matches!(
            size_waves(10, 5.0, 150.0),
            Err(PlanningError::InvalidInput { ref field, .. }) if field == "max_batch_percent"
        ));
        assert!(size_waves(10, f64::NAN, 20.0).is_err());
    }

    #[test]
    fn only_canary_and_waves_are_rollback_eligible() {
        let plan = generate_patch_plan(&PatchPlanInput::new(40, Environment::Development)).unwrap();
        for phase in &plan.phases {
            let expected = matches!(phase.kind, PhaseKind::Canary | PhaseKind::Wave);
            assert_eq!(phase.rollback_eligible, expected, "{}", phase.id);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let input = PatchPlanInput::new(321, Environment::Production)
            .with_change_type(ChangeType::MajorUpgrade);
        assert_eq!(
            generate_patch_plan(&input).unwrap(),
            generate_patch_plan(&input).unwrap()
        );
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let input: PatchPlanInput =
            serde_json::from_str(r#"{"total_assets": 10, "environment": "dev"}"#).unwrap();
        assert_eq!(input.canary_percent, DEFAULT_CANARY_PERCENT);
        assert_eq!(input.max_batch_percent, DEFAULT_MAX_BATCH_PERCENT);
        assert_eq!(input.change_type, ChangeType::Patch);
        assert!(input.max_waves.is_none());
    }
}
