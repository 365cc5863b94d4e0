//! Current-value resolution.
//!
//! Several partially-reliable sources can claim to know "the current value"
//! of a metric: the provider's dedicated current-stats field, the tail of a
//! named history series, and rolling-average fields. Rather than nesting
//! conditionals, the resolver walks an explicit ordered list of source
//! tiers, each a pure function of the payload; the first tier that
//! produces a value wins. The winning tier is logged at debug level; it is
//! the first thing to look at when a resolved value looks wrong.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::ingest::{normalize::normalize, RawProduct, SeriesCode};
use crate::types::{MetricSnapshot, ValueSource};

/// Which metric is being resolved. Controls logging and the default series
/// precedence; the analyzer may override precedence from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Price,
    SalesRank,
    SellerCount,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Price => "price",
            Metric::SalesRank => "sales_rank",
            Metric::SellerCount => "seller_count",
        }
    }

    /// Default series precedence, most trustworthy first. Price prefers the
    /// marketplace-owner series over generic third-party offers over the
    /// publisher list price.
    pub fn default_precedence(self) -> Vec<SeriesCode> {
        match self {
            Metric::Price => vec![SeriesCode::Amazon, SeriesCode::New, SeriesCode::ListPrice],
            Metric::SalesRank => vec![SeriesCode::SalesRank],
            Metric::SellerCount => vec![SeriesCode::OfferCountNew, SeriesCode::OfferCountUsed],
        }
    }
}

/// Tunables for the resolver; see `AnalyticsConfig` for the file-level
/// representation.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// A dedicated-field value older than this is distrusted entirely.
    pub freshness_ceiling_days: i64,
    pub dedicated_confidence: f64,
    pub series_confidence: f64,
    pub rolling_confidence: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            freshness_ceiling_days: 365,
            dedicated_confidence: 0.90,
            series_confidence: 0.70,
            rolling_confidence: 0.45,
        }
    }
}

type TierFn =
    fn(&RawProduct, &[SeriesCode], &ResolverSettings, DateTime<Utc>) -> Option<MetricSnapshot>;

/// Resolve one metric through the tier chain.
///
/// Never fails: when every tier comes up empty the result is the
/// `ValueSource::None` snapshot with zero confidence, which downstream
/// scorers treat as reportable missing data.
pub fn resolve(
    metric: Metric,
    precedence: &[SeriesCode],
    raw: &RawProduct,
    settings: &ResolverSettings,
    now: DateTime<Utc>,
) -> MetricSnapshot {
    let tiers: [(&str, TierFn); 3] = [
        ("dedicated_field", from_dedicated_field),
        ("latest_in_series", from_series_tail),
        ("rolling_average", from_rolling_average),
    ];

    for (name, tier) in tiers {
        if let Some(snapshot) = tier(raw, precedence, settings, now) {
            debug!(
                metric = metric.as_str(),
                tier = name,
                value = snapshot.value,
                "resolved current value"
            );
            return snapshot;
        }
    }

    debug!(metric = metric.as_str(), "no source tier produced a value");
    MetricSnapshot::unresolved()
}

fn age_days(observed_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - observed_at).num_seconds() as f64 / 86_400.0
}

/// Tier 1: the provider's current-stats array, trusted only while the stats
/// block itself is fresh. A missing `last_update` means the age cannot be
/// established, so the tier declines rather than guessing.
fn from_dedicated_field(
    raw: &RawProduct,
    precedence: &[SeriesCode],
    settings: &ResolverSettings,
    now: DateTime<Utc>,
) -> Option<MetricSnapshot> {
    let stats = raw.stats.as_ref()?;
    let observed_at = stats.last_update_utc()?;

    let age = age_days(observed_at, now);
    if age > settings.freshness_ceiling_days as f64 {
        return None;
    }

    let value = precedence.iter().find_map(|code| stats.current(*code))?;

    Some(MetricSnapshot {
        value: Some(value as f64),
        source: ValueSource::DedicatedField,
        confidence: settings.dedicated_confidence,
        observed_at: Some(observed_at),
        age_days: Some(age),
    })
}

/// Tier 2: the most recent point of the highest-precedence non-empty
/// history series. Series are normalized first: the tail of an unsorted
/// array is not the most recent point.
fn from_series_tail(
    raw: &RawProduct,
    precedence: &[SeriesCode],
    settings: &ResolverSettings,
    now: DateTime<Utc>,
) -> Option<MetricSnapshot> {
    for code in precedence {
        let series = normalize(&raw.samples(*code));
        if let Some(last) = series.last() {
            return Some(MetricSnapshot {
                value: Some(last.value),
                source: ValueSource::LatestInSeries,
                confidence: settings.series_confidence,
                observed_at: Some(last.at),
                age_days: Some(age_days(last.at, now)),
            });
        }
    }
    None
}

/// Tier 3: rolling averages, fresher window first. No point-in-time exists
/// for an average, so the snapshot carries no observation age.
fn from_rolling_average(
    raw: &RawProduct,
    precedence: &[SeriesCode],
    settings: &ResolverSettings,
    _now: DateTime<Utc>,
) -> Option<MetricSnapshot> {
    let stats = raw.stats.as_ref()?;

    let value = precedence
        .iter()
        .find_map(|code| stats.avg30(*code).or_else(|| stats.avg90(*code)))?;

    Some(MetricSnapshot {
        value: Some(value as f64),
        source: ValueSource::RollingAverage,
        confidence: settings.rolling_confidence,
        observed_at: None,
        age_days: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{utc_to_provider_minutes, RawStats, NULL_SENTINEL};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn recent_minute() -> i64 {
        utc_to_provider_minutes(now() - Duration::days(2))
    }

    fn settings() -> ResolverSettings {
        ResolverSettings::default()
    }

    fn product_with_all_tiers() -> RawProduct {
        let m = recent_minute();
        RawProduct {
            asin: "B000TEST01".into(),
            csv: Some(vec![
                Some(vec![m, 3050]), // amazon series
                Some(vec![m, 2850]), // new series
            ]),
            stats: Some(RawStats {
                current: Some(vec![2999]),
                avg30: Some(vec![3100]),
                last_update: Some(m),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_dedicated_field_wins_when_all_present() {
        let raw = product_with_all_tiers();
        let snap = resolve(
            Metric::Price,
            &Metric::Price.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.source, ValueSource::DedicatedField);
        assert_eq!(snap.value, Some(2999.0));
        assert_eq!(snap.confidence, 0.90);
        assert!(snap.age_days.unwrap() < 3.0);
    }

    #[test]
    fn test_falls_through_to_series_without_dedicated() {
        let mut raw = product_with_all_tiers();
        raw.stats.as_mut().unwrap().current = None;

        let snap = resolve(
            Metric::Price,
            &Metric::Price.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.source, ValueSource::LatestInSeries);
        // Amazon series outranks the cheaper third-party series.
        assert_eq!(snap.value, Some(3050.0));
    }

    #[test]
    fn test_series_precedence_is_configurable() {
        let mut raw = product_with_all_tiers();
        raw.stats = None;

        let snap = resolve(
            Metric::Price,
            &[SeriesCode::New, SeriesCode::Amazon],
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.value, Some(2850.0));
    }

    #[test]
    fn test_stale_dedicated_field_rejected() {
        let mut raw = product_with_all_tiers();
        let stale = utc_to_provider_minutes(now() - Duration::days(400));
        raw.stats.as_mut().unwrap().last_update = Some(stale);
        raw.csv = None;
        raw.stats.as_mut().unwrap().avg30 = None;

        let snap = resolve(
            Metric::Price,
            &Metric::Price.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        // Too old for tier 1, nothing left for tiers 2/3.
        assert_eq!(snap.source, ValueSource::None);
    }

    #[test]
    fn test_missing_last_update_skips_dedicated_tier() {
        let mut raw = product_with_all_tiers();
        raw.stats.as_mut().unwrap().last_update = None;

        let snap = resolve(
            Metric::Price,
            &Metric::Price.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.source, ValueSource::LatestInSeries);
    }

    #[test]
    fn test_rolling_average_is_last_resort() {
        let raw = RawProduct {
            asin: "B000TEST01".into(),
            stats: Some(RawStats {
                avg30: Some(vec![NULL_SENTINEL, 3100]),
                avg90: Some(vec![3200]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let snap = resolve(
            Metric::Price,
            &Metric::Price.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.source, ValueSource::RollingAverage);
        // amazon avg30 is sentinel, amazon avg90 answers before new avg30.
        assert_eq!(snap.value, Some(3200.0));
        assert!(snap.observed_at.is_none());
    }

    #[test]
    fn test_nothing_resolves_to_none_not_error() {
        let raw = RawProduct {
            asin: "B000TEST01".into(),
            ..Default::default()
        };
        let snap = resolve(
            Metric::SalesRank,
            &Metric::SalesRank.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.source, ValueSource::None);
        assert_eq!(snap.confidence, 0.0);
        assert!(snap.value.is_none());
    }

    #[test]
    fn test_series_tail_uses_sorted_order() {
        // Newest-first wire order: the tail must still be the newest point.
        let old = utc_to_provider_minutes(now() - Duration::days(30));
        let new = recent_minute();
        let raw = RawProduct {
            asin: "B000TEST01".into(),
            csv: Some(vec![None, None, None, Some(vec![new, 38000, old, 52000])]),
            ..Default::default()
        };

        let snap = resolve(
            Metric::SalesRank,
            &Metric::SalesRank.default_precedence(),
            &raw,
            &settings(),
            now(),
        );
        assert_eq!(snap.value, Some(38000.0));
    }
}
