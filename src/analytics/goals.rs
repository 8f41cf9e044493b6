//! Goal-percentage math shared by the reporting surfaces

use serde::{Deserialize, Serialize};

/// Weight of each wellness component in the daily score
const WATER_WEIGHT: f64 = 0.3;
const SLEEP_WEIGHT: f64 = 0.4;
const STEPS_WEIGHT: f64 = 0.3;

/// Capped integer percentage of `value` against `target`; zero when the
/// target is unset or non-positive.
pub fn percent_of_goal(value: f64, target: f64) -> u32 {
    if target <= 0.0 {
        return 0;
    }
    (value / target * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Daily targets for the tracked wellness metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthGoals {
    pub water_ml: f64,
    pub sleep_hours: f64,
    pub steps: f64,
}

impl Default for HealthGoals {
    fn default() -> Self {
        Self {
            water_ml: 2000.0,
            sleep_hours: 8.0,
            steps: 8000.0,
        }
    }
}

/// One day's logged wellness totals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthRecord {
    pub water_ml: f64,
    pub sleep_hours: f64,
    pub steps: f64,
}

/// Composite daily wellness score in 0..=100.
///
/// Each component ratio is capped at 1 before weighting; rounding happens
/// once on the blended value, not per component.
pub fn health_score(record: &HealthRecord, goals: &HealthGoals) -> u32 {
    let blend = WATER_WEIGHT * capped_ratio(record.water_ml, goals.water_ml)
        + SLEEP_WEIGHT * capped_ratio(record.sleep_hours, goals.sleep_hours)
        + STEPS_WEIGHT * capped_ratio(record.steps, goals.steps);

    (blend * 100.0).round().clamp(0.0, 100.0) as u32
}

fn capped_ratio(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (value / target).clamp(0.0, 1.0)
}
