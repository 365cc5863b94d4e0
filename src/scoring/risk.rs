//! Composite risk scoring.
//!
//! Combines trend, volatility, data quality and competitive signals into
//! one weighted risk score with a per-component breakdown. Consumers audit
//! *why* a product was flagged, so every component reports its own 0–100
//! risk sub-score alongside the total.

use serde::{Deserialize, Serialize};

use crate::types::{RiskTier, ScoreResult};

/// Neutral sub-score substituted for any unknown component.
const NEUTRAL_RISK: f64 = 50.0;

/// Risk added per seller on the listing before the cap. More competition
/// on the same listing means thinner, shorter-lived margins.
const RISK_PER_SELLER: f64 = 5.0;

const OWNER_PRESENT_RISK: f64 = 95.0;
const OWNER_ABSENT_RISK: f64 = 5.0;

/// Component weights. Serde-deserializable so deployments can re-balance
/// without a code change; weights are renormalized before use, so they do
/// not need to sum to exactly 1.0 in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWeights {
    #[serde(default = "default_owner_weight")]
    pub owner: f64,
    #[serde(default = "default_sellers_weight")]
    pub sellers: f64,
    #[serde(default = "default_volatility_weight")]
    pub volatility: f64,
    #[serde(default = "default_trend_weight")]
    pub trend: f64,
    #[serde(default = "default_data_weight")]
    pub data: f64,
}

fn default_owner_weight() -> f64 {
    0.25
}
fn default_sellers_weight() -> f64 {
    0.20
}
fn default_volatility_weight() -> f64 {
    0.20
}
fn default_trend_weight() -> f64 {
    0.15
}
fn default_data_weight() -> f64 {
    0.20
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            owner: default_owner_weight(),
            sellers: default_sellers_weight(),
            volatility: default_volatility_weight(),
            trend: default_trend_weight(),
            data: default_data_weight(),
        }
    }
}

impl RiskWeights {
    fn normalized(&self) -> RiskWeights {
        let sum = self.owner + self.sellers + self.volatility + self.trend + self.data;
        if sum <= 0.0 || !sum.is_finite() {
            return RiskWeights::default();
        }
        RiskWeights {
            owner: self.owner / sum,
            sellers: self.sellers / sum,
            volatility: self.volatility / sum,
            trend: self.trend / sum,
            data: self.data / sum,
        }
    }
}

/// Inputs to the composite score. Optional components substitute their
/// documented neutral default when absent.
#[derive(Debug, Clone)]
pub struct RiskInputs<'a> {
    pub velocity: &'a ScoreResult,
    pub stability: &'a ScoreResult,
    pub data_confidence: &'a ScoreResult,
    pub seller_count: Option<f64>,
    pub owner_on_listing: Option<bool>,
}

fn owner_risk(present: Option<bool>) -> f64 {
    match present {
        Some(true) => OWNER_PRESENT_RISK,
        Some(false) => OWNER_ABSENT_RISK,
        None => NEUTRAL_RISK,
    }
}

fn seller_risk(count: Option<f64>) -> f64 {
    match count {
        Some(c) if c >= 0.0 => (c * RISK_PER_SELLER).min(100.0),
        _ => NEUTRAL_RISK,
    }
}

/// Compute the weighted composite risk score.
pub fn risk_score(inputs: &RiskInputs<'_>, weights: &RiskWeights) -> ScoreResult {
    let w = weights.normalized();

    let owner = owner_risk(inputs.owner_on_listing);
    let sellers = seller_risk(inputs.seller_count);
    let volatility = 100.0 - inputs.stability.score as f64;
    let trend = 100.0 - inputs.velocity.score as f64;
    let data = 100.0 - inputs.data_confidence.score as f64;

    let weighted = owner * w.owner
        + sellers * w.sellers
        + volatility * w.volatility
        + trend * w.trend
        + data * w.data;

    let score = weighted.clamp(0.0, 100.0) as u8;
    let tier = RiskTier::from_score(score);

    ScoreResult::new("risk", score, tier.to_string())
        .with_component("marketplace_owner", owner)
        .with_component("seller_count", sellers)
        .with_component("price_volatility", volatility)
        .with_component("rank_trend", trend)
        .with_component("data_quality", data)
        .with_detail(format!(
            "owner {owner:.0} · sellers {sellers:.0} · volatility {volatility:.0} · trend {trend:.0} · data {data:.0}"
        ))
}
