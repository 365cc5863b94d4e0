//! Core domain types.
//!
//! Everything here is plain serde data: the API layer serializes records
//! without reaching back into the scoring internals, and records are value
//! objects: built once per analysis run, never patched afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single (timestamp, value) sample for one metric.
///
/// Only the normalizer constructs these; by then the provider's null
/// sentinel has already been filtered out, so `value` is always real.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// An ordered series of observations for one metric.
///
/// Invariant: timestamps ascend (non-decreasing) and no sentinel values
/// remain. The only producer is [`crate::ingest::normalize`]; downstream
/// stages get a read-only view and derive new series instead of mutating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<Observation>,
}

impl TimeSeries {
    /// Construct from points that are already ascending. Callers outside
    /// the normalizer should go through `normalize` instead.
    pub(crate) fn from_sorted(points: Vec<Observation>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].at <= w[1].at));
        Self { points }
    }

    /// Test-only: build a series without the ordering invariant, for
    /// reproducing what scorers did to unsorted input.
    #[cfg(test)]
    pub(crate) fn from_unchecked(points: Vec<Observation>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn first(&self) -> Option<&Observation> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.points.last()
    }

    /// New series restricted to observations at or after `cutoff`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> TimeSeries {
        TimeSeries {
            points: self
                .points
                .iter()
                .copied()
                .filter(|p| p.at >= cutoff)
                .collect(),
        }
    }
}

/// Which source tier produced a resolved metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueSource {
    /// Provider's dedicated current-snapshot field.
    DedicatedField,
    /// Most recent point of a named time series.
    LatestInSeries,
    /// Rolling-average field, last resort.
    RollingAverage,
    /// No tier succeeded. A valid, reportable outcome: not an error.
    None,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueSource::DedicatedField => "dedicated_field",
            ValueSource::LatestInSeries => "latest_in_series",
            ValueSource::RollingAverage => "rolling_average",
            ValueSource::None => "none",
        };
        f.write_str(s)
    }
}

/// The resolved "current" value of one metric plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub value: Option<f64>,
    pub source: ValueSource,
    /// 0.0–1.0, fixed per source tier.
    pub confidence: f64,
    /// When the winning source last observed the value, if known.
    pub observed_at: Option<DateTime<Utc>>,
    /// Age of the observation relative to the analysis clock.
    pub age_days: Option<f64>,
}

impl MetricSnapshot {
    /// The "nothing resolved" snapshot.
    pub fn unresolved() -> Self {
        Self {
            value: None,
            source: ValueSource::None,
            confidence: 0.0,
            observed_at: None,
            age_days: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

/// One named contribution to a score, on that component's own 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub value: f64,
}

/// A named score in [0, 100] with a tier label and a breakdown of the
/// components that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub name: String,
    pub score: u8,
    pub tier: String,
    pub components: Vec<ScoreComponent>,
    /// Set when the input was too sparse for the statistic and a documented
    /// default was used instead.
    pub insufficient_data: bool,
    pub detail: String,
}

impl ScoreResult {
    pub fn new(name: &str, score: u8, tier: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            score: score.min(100),
            tier: tier.into(),
            components: Vec::new(),
            insufficient_data: false,
            detail: String::new(),
        }
    }

    pub fn with_component(mut self, name: &str, value: f64) -> Self {
        self.components.push(ScoreComponent {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn insufficient(mut self) -> Self {
        self.insufficient_data = true;
        self
    }
}

/// Risk tier derived from the composite risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => RiskTier::Low,
            25..=49 => RiskTier::Medium,
            50..=74 => RiskTier::High,
            _ => RiskTier::Critical,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
            RiskTier::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Profit tier derived from ROI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfitTier {
    Excellent,
    Good,
    Fair,
    /// Not worth sourcing.
    Pass,
}

impl std::fmt::Display for ProfitTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProfitTier::Excellent => "EXCELLENT",
            ProfitTier::Good => "GOOD",
            ProfitTier::Fair => "FAIR",
            ProfitTier::Pass => "PASS",
        };
        f.write_str(s)
    }
}

/// Itemized fees and profit numbers for one sourcing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profitability {
    pub sell_price: Decimal,
    pub acquisition_cost: Decimal,
    pub referral_fee: Decimal,
    pub closing_fee: Decimal,
    pub fulfillment_fee: Decimal,
    pub total_fees: Decimal,
    pub net_profit: Decimal,
    /// None when acquisition cost is zero (ROI undefined, not infinite).
    pub roi_percent: Option<Decimal>,
    /// None when sell price is zero.
    pub margin_percent: Option<Decimal>,
    pub tier: ProfitTier,
}

/// The aggregate analysis for one ASIN at one point in time.
///
/// Best-effort by construction: unresolvable metrics arrive as
/// `ValueSource::None` snapshots and sparse statistics as flagged defaults,
/// so consumers always get a complete, explainable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub asin: String,
    pub analyzed_at: DateTime<Utc>,

    pub price: MetricSnapshot,
    pub sales_rank: MetricSnapshot,
    pub seller_count: MetricSnapshot,

    pub velocity: ScoreResult,
    pub stability: ScoreResult,
    pub data_confidence: ScoreResult,
    pub risk: ScoreResult,

    pub profitability: Option<Profitability>,

    /// Human-readable caveats accumulated during analysis.
    pub flags: Vec<String>,
}
