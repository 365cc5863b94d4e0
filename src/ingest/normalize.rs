//! Time-series normalization.
//!
//! The provider does not guarantee chronological order inside a history
//! array, and out-of-order input silently flips the sign of any
//! oldest-vs-newest comparison downstream. Every series therefore passes
//! through [`normalize`] before a scorer sees it: the sort is
//! unconditional, never skipped on "already sorted" input.

use chrono::{DateTime, Utc};

use super::{provider_minutes_to_utc, RawSample};
use crate::types::{Observation, TimeSeries};

/// Build a clean ascending series from raw provider samples.
///
/// Drops sentinel values and samples whose timestamp cannot be converted,
/// then stable-sorts by timestamp. Empty input yields an empty series.
pub fn normalize(samples: &[RawSample]) -> TimeSeries {
    let mut points: Vec<Observation> = samples
        .iter()
        .filter(|s| s.is_valid())
        .filter_map(|s| {
            provider_minutes_to_utc(s.minute).map(|at| Observation {
                at,
                value: s.value as f64,
            })
        })
        .collect();

    points.sort_by_key(|p| p.at);
    TimeSeries::from_sorted(points)
}

/// Normalize, then restrict to observations at or after `cutoff`.
pub fn normalize_since(samples: &[RawSample], cutoff: DateTime<Utc>) -> TimeSeries {
    normalize(samples).since(cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::NULL_SENTINEL;

    fn sample(minute: i64, value: i64) -> RawSample {
        RawSample { minute, value }
    }

    #[test]
    fn test_empty_input_empty_output() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_sorts_out_of_order_input() {
        // Shape taken from a real provider response where newest came first.
        let raw = vec![
            sample(5_002_880, 39000),
            sample(5_000_000, 36000),
            sample(5_001_440, 37500),
        ];
        let series = normalize(&raw);

        let values: Vec<f64> = series.values().collect();
        assert_eq!(values, vec![36000.0, 37500.0, 39000.0]);
    }

    #[test]
    fn test_monotonic_invariant() {
        let raw = vec![
            sample(300, 3),
            sample(100, 1),
            sample(200, 2),
            sample(100, 4), // duplicate timestamp is kept, order stable
        ];
        let series = normalize(&raw);
        let points = series.points();
        assert!(points.windows(2).all(|w| w[0].at <= w[1].at));
        assert_eq!(series.len(), 4);
    }

    #[test]
    fn test_sentinel_values_removed_not_zeroed() {
        let raw = vec![
            sample(100, 2999),
            sample(200, NULL_SENTINEL),
            sample(300, 3199),
        ];
        let series = normalize(&raw);

        assert_eq!(series.len(), 2);
        assert!(series.values().all(|v| v != NULL_SENTINEL as f64 && v != 0.0));
    }

    #[test]
    fn test_unparseable_timestamps_dropped() {
        let raw = vec![sample(0, 100), sample(-7, 100), sample(500, 100)];
        let series = normalize(&raw);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_order_invariance() {
        // Normalizing any permutation of the same samples must produce the
        // identical series. Regression for the unsorted-feed trend bug.
        let base = vec![
            sample(100, 10),
            sample(400, 40),
            sample(200, 20),
            sample(300, 30),
            sample(500, NULL_SENTINEL),
        ];
        let reference = normalize(&base);

        let mut rotated = base.clone();
        rotated.reverse();
        assert_eq!(normalize(&rotated), reference);

        rotated.rotate_left(2);
        assert_eq!(normalize(&rotated), reference);
    }

    #[test]
    fn test_normalize_since_window() {
        let raw = vec![sample(1000, 1), sample(2000, 2), sample(3000, 3)];
        let cutoff = provider_minutes_to_utc(2000).unwrap();
        let series = normalize_since(&raw, cutoff);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().value, 2.0);
    }
}
