// estimate.rs: Duration and failure-rate tables.
//
// Every planner estimates time and failures from the same fixed tables so
// the numbers agree across patch plans, rollout simulations and rollbacks.

use crate::types::{ChangeType, Environment};

/// Minutes of health checking after each batch lands.
pub const HEALTH_CHECK_MINUTES: u32 = 10;

/// Hands-on minutes to apply a change to one asset.
pub fn minutes_per_asset(change: ChangeType) -> u32 {
    match change {
        ChangeType::Patch => 15,
        ChangeType::MajorUpgrade => 45,
        ChangeType::ConfigChange => 5,
        ChangeType::Reboot => 10,
    }
}

/// How many assets may be changed concurrently.
pub fn parallelism(env: Environment) -> u64 {
    match env {
        Environment::Production => 10,
        Environment::Staging => 25,
        Environment::Development => 50,
    }
}

/// Historical per-asset failure probability.
pub fn failure_rate(change: ChangeType) -> f64 {
    match change {
        ChangeType::Patch => 0.01,
        ChangeType::MajorUpgrade => 0.05,
        ChangeType::ConfigChange => 0.005,
        ChangeType::Reboot => 0.02,
    }
}

/// Minutes to push `count` assets: sequential slots of `parallelism(env)`
/// assets each, followed by one health-check window. Zero assets take zero
/// minutes.
pub fn batch_minutes(count: u64, env: Environment, change: ChangeType) -> u32 {
    if count == 0 {
        return 0;
    }
    let slots = count.div_ceil(parallelism(env));
    let work = slots.saturating_mul(u64::from(minutes_per_asset(change)));
    u32::try_from(work)
        .unwrap_or(u32::MAX)
        .saturating_add(HEALTH_CHECK_MINUTES)
}

/// Expected failures among `count` assets, rounded to the nearest asset.
pub fn expected_failures(count: u64, change: ChangeType) -> u64 {
    (count as f64 * failure_rate(change)).round() as u64
}

/// `part` as a percentage of `whole`, rounded to two decimals.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 * 100.0 / whole as f64;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_minutes_uses_parallel_slots() {
        // 20 assets at 10-way parallelism = 2 slots × 15 min + 10 min checks.
        assert_eq!(
            batch_minutes(20, Environment::Production, ChangeType::Patch),
            40
        );
        // 21 assets spill into a third slot.
        assert_eq!(
            batch_minutes(21, Environment::Production, ChangeType::Patch),
            55
        );
        assert_eq!(
            batch_minutes(0, Environment::Production, ChangeType::Patch),
            0
        );
    }

    #[test]
    fn expected_failures_round() {
        assert_eq!(expected_failures(150, ChangeType::Patch), 2);
        assert_eq!(expected_failures(100, ChangeType::MajorUpgrade), 5);
        assert_eq!(expected_failures(10, ChangeType::ConfigChange), 0);
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        assert_eq!(percent_of(1, 3), 33.33);
        assert_eq!(percent_of(5, 100), 5.0);
        assert_eq!(percent_of(3, 0), 0.0);
    }
}
