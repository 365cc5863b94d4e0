//! Velocity (trend) scoring.
//!
//! Compares the average of an early window against a late window of a
//! chronologically-normalized series. Scores above 50 mean the metric is
//! improving, below 50 degrading. The comparison is meaningless on
//! unsorted input (the same data sorted and unsorted can flip the trend
//! sign), so callers must hand in normalizer output only.

use crate::types::{ScoreResult, TimeSeries};

use super::to_score;

/// Whether a smaller value of the metric is the good direction.
/// Sales rank improves downward; prices and counts upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

#[derive(Debug, Clone)]
pub struct VelocitySettings {
    /// Points per comparison window.
    pub window: usize,
}

impl Default for VelocitySettings {
    fn default() -> Self {
        Self { window: 7 }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn tier_for(score: u8) -> &'static str {
    match score {
        0..=44 => "declining",
        45..=54 => "flat",
        _ => "improving",
    }
}

/// Score the trend of a normalized series.
///
/// Fewer than two points yields the neutral score with the
/// `insufficient_data` flag; fewer than `2 * window` points shrinks both
/// windows to what is available. A zero early-window mean defines the
/// improvement as zero instead of dividing by it.
pub fn velocity_score(
    series: &TimeSeries,
    direction: Direction,
    settings: &VelocitySettings,
) -> ScoreResult {
    let values: Vec<f64> = series.values().collect();
    let n = values.len();

    if n < 2 {
        return ScoreResult::new("velocity", 50, "flat")
            .insufficient()
            .with_detail(format!("{n} point(s), trend undefined"));
    }

    let k = settings.window.min(n / 2).max(1);
    let early_mean = mean(&values[..k]);
    let late_mean = mean(&values[n - k..]);

    let improvement = if early_mean == 0.0 {
        0.0
    } else {
        match direction {
            Direction::LowerIsBetter => (early_mean - late_mean) / early_mean,
            Direction::HigherIsBetter => (late_mean - early_mean) / early_mean,
        }
    };

    let score = to_score(0.5 + improvement * 0.5);

    ScoreResult::new("velocity", score, tier_for(score))
        .with_component("early_mean", early_mean)
        .with_component("late_mean", late_mean)
        .with_component("improvement_pct", improvement * 100.0)
        .with_detail(format!(
            "early {k}-pt mean {early_mean:.1} vs late {k}-pt mean {late_mean:.1}"
        ))
}
