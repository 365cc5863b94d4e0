//! Data-confidence scoring.
//!
//! Folds the resolver's per-metric confidence and observation age into one
//! score: how much the rest of the analysis deserves to be believed. Also
//! the recency input to the composite risk score.

use crate::types::{MetricSnapshot, ScoreResult};

use super::to_score;

/// Age below which no decay applies, in days.
const FRESH_WINDOW_DAYS: f64 = 30.0;

fn tier_for(score: u8) -> &'static str {
    match score {
        0..=24 => "none",
        25..=49 => "low",
        50..=74 => "moderate",
        _ => "high",
    }
}

fn freshness_factor(age_days: Option<f64>, ceiling_days: f64) -> f64 {
    match age_days {
        // No point-in-time (rolling averages): tier confidence already
        // discounts these, no extra decay.
        None => 1.0,
        Some(age) if age <= FRESH_WINDOW_DAYS => 1.0,
        Some(age) => {
            let span = (ceiling_days - FRESH_WINDOW_DAYS).max(1.0);
            (1.0 - (age - FRESH_WINDOW_DAYS) / span).clamp(0.0, 1.0)
        }
    }
}

/// Combine named snapshots into a single confidence score.
///
/// Each metric contributes its resolver confidence decayed by observation
/// age; unresolved metrics contribute zero. All-unresolved input flags the
/// result as insufficient rather than failing.
pub fn data_confidence_score(
    snapshots: &[(&str, &MetricSnapshot)],
    freshness_ceiling_days: i64,
) -> ScoreResult {
    if snapshots.is_empty() {
        return ScoreResult::new("data_confidence", 0, "none")
            .insufficient()
            .with_detail("no metrics to assess");
    }

    let ceiling = freshness_ceiling_days as f64;
    let mut result = ScoreResult::new("data_confidence", 0, "none");
    let mut total = 0.0;

    for (name, snap) in snapshots {
        let sub = if snap.is_resolved() {
            snap.confidence * freshness_factor(snap.age_days, ceiling) * 100.0
        } else {
            0.0
        };
        total += sub;
        result = result.with_component(name, sub);
    }

    let score = to_score(total / (snapshots.len() as f64 * 100.0));
    result.score = score;
    result.tier = tier_for(score).to_string();
    result.detail = format!("mean of {} metric confidences", snapshots.len());

    if snapshots.iter().all(|(_, s)| !s.is_resolved()) {
        result = result.insufficient();
    }
    result
}
