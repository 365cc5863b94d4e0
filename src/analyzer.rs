//! Analysis pipeline assembly.
//!
//! `analyze` is the single synchronous entry point the API layer calls:
//! raw payload in, complete `AnalysisRecord` out. Only structural
//! malformation errors; sparse data flows through as flagged best-effort
//! values. Batch runs fan the same pure pipeline out over many ASINs with
//! bounded concurrency and per-item failure isolation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::ProductSource;
use crate::config::AnalyticsConfig;
use crate::error::{AppError, Result};
use crate::ingest::{cents_to_decimal, normalize::normalize, RawProduct, SeriesCode};
use crate::resolve::{resolve, Metric, ResolverSettings};
use crate::scoring::{
    data_confidence_score, profitability, risk_score, stability_score, velocity_score, Direction,
    FeeSchedule, RiskInputs, VelocitySettings,
};
use crate::types::{AnalysisRecord, MetricSnapshot, TimeSeries};

pub struct Analyzer {
    analytics: AnalyticsConfig,
    fees: FeeSchedule,
}

impl Analyzer {
    pub fn new(analytics: AnalyticsConfig, fees: FeeSchedule) -> Self {
        Self { analytics, fees }
    }

    fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            freshness_ceiling_days: self.analytics.freshness_ceiling_days,
            dedicated_confidence: self.analytics.dedicated_confidence,
            series_confidence: self.analytics.series_confidence,
            rolling_confidence: self.analytics.rolling_confidence,
        }
    }

    /// The highest-precedence price series with any history, normalized.
    /// Stability is scored on actual history, not on resolved snapshots.
    fn price_history(&self, raw: &RawProduct) -> TimeSeries {
        for code in &self.analytics.price_series {
            let series = normalize(&raw.samples(*code));
            if !series.is_empty() {
                return series;
            }
        }
        TimeSeries::empty()
    }

    /// Marketplace-owner presence: the buy-box flag when the provider sent
    /// one, otherwise inferred from the owner's current price slot. No
    /// stats at all means unknown, not absent.
    fn owner_on_listing(raw: &RawProduct) -> Option<bool> {
        let stats = raw.stats.as_ref()?;
        if let Some(flag) = stats.buy_box_is_amazon {
            return Some(flag);
        }
        stats
            .current
            .as_ref()
            .map(|_| stats.current(SeriesCode::Amazon).is_some())
    }

    /// Analyze one product payload. Pure and synchronous: same inputs and
    /// clock, same record.
    pub fn analyze(
        &self,
        raw: &RawProduct,
        acquisition_cost: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisRecord> {
        if raw.asin.trim().is_empty() {
            return Err(AppError::MalformedPayload("missing asin".to_string()));
        }
        if !raw.has_structure() {
            return Err(AppError::MalformedPayload(format!(
                "{}: payload has neither history nor stats",
                raw.asin
            )));
        }

        let settings = self.resolver_settings();
        let mut flags = Vec::new();

        let price = resolve(
            Metric::Price,
            &self.analytics.price_series,
            raw,
            &settings,
            now,
        );
        let sales_rank = resolve(
            Metric::SalesRank,
            &Metric::SalesRank.default_precedence(),
            raw,
            &settings,
            now,
        );
        let seller_count = resolve(
            Metric::SellerCount,
            &self.analytics.seller_series,
            raw,
            &settings,
            now,
        );
        for (metric, snap) in [
            ("price", &price),
            ("sales_rank", &sales_rank),
            ("seller_count", &seller_count),
        ] {
            if !snap.is_resolved() {
                flags.push(format!("{metric} unresolved from any source"));
            }
        }

        let rank_history = normalize(&raw.samples(SeriesCode::SalesRank));
        let velocity = velocity_score(
            &rank_history,
            Direction::LowerIsBetter,
            &VelocitySettings {
                window: self.analytics.velocity_window,
            },
        );
        let stability = stability_score(&self.price_history(raw));
        let data_confidence = data_confidence_score(
            &[
                ("price", &price),
                ("sales_rank", &sales_rank),
                ("seller_count", &seller_count),
            ],
            self.analytics.freshness_ceiling_days,
        );

        let risk = risk_score(
            &RiskInputs {
                velocity: &velocity,
                stability: &stability,
                data_confidence: &data_confidence,
                seller_count: seller_count.value,
                owner_on_listing: Self::owner_on_listing(raw),
            },
            &self.analytics.risk_weights,
        );

        let profit = self.profitability_for(raw, &price, acquisition_cost, now, &mut flags);

        Ok(AnalysisRecord {
            id: Uuid::new_v4(),
            asin: raw.asin.clone(),
            analyzed_at: now,
            price,
            sales_rank,
            seller_count,
            velocity,
            stability,
            data_confidence,
            risk,
            profitability: profit,
            flags,
        })
    }

    fn profitability_for(
        &self,
        raw: &RawProduct,
        price: &MetricSnapshot,
        acquisition_cost: Option<Decimal>,
        now: DateTime<Utc>,
        flags: &mut Vec<String>,
    ) -> Option<crate::types::Profitability> {
        let Some(sell_cents) = price.value else {
            flags.push("profitability skipped: no sell price".to_string());
            return None;
        };
        let sell_price = cents_to_decimal(sell_cents as i64);

        // Caller-supplied cost wins; the current used price is the standing
        // estimate of what the book can be sourced for.
        let cost = acquisition_cost.or_else(|| {
            let used = resolve(
                Metric::Price,
                &[SeriesCode::Used],
                raw,
                &self.resolver_settings(),
                now,
            );
            let estimate = used.value.map(|v| cents_to_decimal(v as i64));
            if estimate.is_some() {
                flags.push("acquisition cost estimated from used price".to_string());
            }
            estimate
        });
        let Some(cost) = cost else {
            flags.push("profitability skipped: no acquisition cost".to_string());
            return None;
        };

        let fees = self.fees.for_category(raw.category.as_deref());
        Some(profitability(sell_price, cost, raw.weight_kg(), fees))
    }
}

/// Result of one item in a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub asin: String,
    pub result: Result<AnalysisRecord>,
}

/// Fetch and analyze many ASINs with bounded concurrency.
///
/// Each item is independently success/failure tagged; a fetch or parse
/// failure on one ASIN never aborts its siblings. Output order follows
/// completion, not input.
pub async fn run_batch(
    source: Arc<dyn ProductSource>,
    analyzer: Arc<Analyzer>,
    asins: Vec<String>,
    concurrency: usize,
) -> Vec<BatchOutcome> {
    let total = asins.len();
    info!(total, concurrency, "starting batch analysis");

    let outcomes: Vec<BatchOutcome> = stream::iter(asins)
        .map(|asin| {
            let source = Arc::clone(&source);
            let analyzer = Arc::clone(&analyzer);
            async move {
                let result = match source.fetch_product(&asin).await {
                    Ok(raw) => analyzer.analyze(&raw, None, Utc::now()),
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    warn!(asin = %asin, error = %e, "batch item failed");
                }
                BatchOutcome { asin, result }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(total, failed, "batch analysis finished");
    outcomes
}
