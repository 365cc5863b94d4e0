//! Stability (inverse volatility) scoring.
//!
//! Coefficient of variation mapped onto [0, 100], higher = steadier. A
//! jumpy price or offer count is a bad arbitrage signal even when the
//! average looks attractive.

use crate::types::{ScoreResult, TimeSeries};

use super::to_score;

fn tier_for(score: u8) -> &'static str {
    match score {
        0..=49 => "volatile",
        50..=79 => "moderate",
        _ => "stable",
    }
}

/// Score dispersion of a normalized series.
///
/// CV = population stdev / mean × 100, score = 100 − min(CV, 100).
/// Degenerate inputs, meaning under two points (stdev undefined) or a
/// zero mean (the historical division fault), report zero volatility with
/// the `insufficient_data` flag instead of raising.
pub fn stability_score(series: &TimeSeries) -> ScoreResult {
    let values: Vec<f64> = series.values().collect();
    let n = values.len();

    if n < 2 {
        return ScoreResult::new("stability", 100, "stable")
            .with_component("coefficient_of_variation", 0.0)
            .insufficient()
            .with_detail(format!("{n} point(s), dispersion undefined"));
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return ScoreResult::new("stability", 100, "stable")
            .with_component("mean", 0.0)
            .with_component("coefficient_of_variation", 0.0)
            .insufficient()
            .with_detail("zero-mean series, dispersion undefined");
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let cv = variance.sqrt() / mean * 100.0;
    let score = to_score((100.0 - cv.min(100.0)) / 100.0);

    ScoreResult::new("stability", score, tier_for(score))
        .with_component("mean", mean)
        .with_component("stdev", variance.sqrt())
        .with_component("coefficient_of_variation", cv)
        .with_detail(format!("cv {cv:.2}% over {n} points"))
}
