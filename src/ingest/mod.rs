//! Provider payload model and sample extraction.
//!
//! The market-data provider returns one nested JSON document per ASIN:
//! per-metric history arrays of alternating (minute, value) pairs, a
//! dedicated current-stats array, and rolling-average arrays. Values use a
//! null sentinel, timestamps are integer minutes since the provider epoch,
//! and prices are integer cents. This module owns all of those conventions
//! so the rest of the crate never sees a magic number.

pub mod normalize;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Provider value meaning "no data". Never a real numeric input.
pub const NULL_SENTINEL: i64 = -1;

/// Minutes between the Unix epoch and the provider epoch
/// (2011-01-01 00:00:00 UTC).
pub const PROVIDER_EPOCH_OFFSET_MIN: i64 = 21_564_000;

/// Convert provider minutes to wall-clock time.
///
/// Returns `None` for non-positive or overflowing inputs rather than
/// inventing a date.
pub fn provider_minutes_to_utc(minutes: i64) -> Option<DateTime<Utc>> {
    if minutes <= 0 {
        return None;
    }
    let secs = minutes.checked_add(PROVIDER_EPOCH_OFFSET_MIN)?.checked_mul(60)?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Inverse of [`provider_minutes_to_utc`].
pub fn utc_to_provider_minutes(at: DateTime<Utc>) -> i64 {
    at.timestamp() / 60 - PROVIDER_EPOCH_OFFSET_MIN
}

/// Convert a provider price in integer cents to decimal dollars.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Index of one named history array in the provider's `csv` field.
///
/// The numeric values are the provider's wire indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesCode {
    /// Marketplace-owner (Amazon) offer price.
    Amazon,
    /// Lowest third-party new offer price.
    New,
    /// Lowest third-party used offer price.
    Used,
    /// Sales rank (lower = sells faster).
    SalesRank,
    /// Publisher list price.
    ListPrice,
    /// Count of new offers on the listing.
    OfferCountNew,
    /// Count of used offers on the listing.
    OfferCountUsed,
}

impl SeriesCode {
    /// Wire index into `csv`, `stats.current` and the rolling-average arrays.
    pub fn index(self) -> usize {
        match self {
            SeriesCode::Amazon => 0,
            SeriesCode::New => 1,
            SeriesCode::Used => 2,
            SeriesCode::SalesRank => 3,
            SeriesCode::ListPrice => 4,
            SeriesCode::OfferCountNew => 11,
            SeriesCode::OfferCountUsed => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeriesCode::Amazon => "amazon",
            SeriesCode::New => "new",
            SeriesCode::Used => "used",
            SeriesCode::SalesRank => "sales_rank",
            SeriesCode::ListPrice => "list_price",
            SeriesCode::OfferCountNew => "offer_count_new",
            SeriesCode::OfferCountUsed => "offer_count_used",
        }
    }
}

/// One raw (minute, value) pair exactly as the provider delivered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub minute: i64,
    pub value: i64,
}

impl RawSample {
    /// The single validity predicate for provider samples: a usable sample
    /// has a convertible timestamp and a non-sentinel value. Every sentinel
    /// check in the crate goes through here or [`is_real_value`].
    pub fn is_valid(&self) -> bool {
        self.minute > 0 && is_real_value(self.value)
    }
}

/// Whether a scalar provider value carries data.
pub fn is_real_value(value: i64) -> bool {
    value != NULL_SENTINEL && value >= 0
}

/// Dedicated current/rolling statistics block of a product payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStats {
    /// Current value per series code, sentinel-padded.
    #[serde(default)]
    pub current: Option<Vec<i64>>,
    /// 30-day rolling average per series code.
    #[serde(default)]
    pub avg30: Option<Vec<i64>>,
    /// 90-day rolling average per series code.
    #[serde(default)]
    pub avg90: Option<Vec<i64>>,
    /// Provider minute of the last stats refresh.
    #[serde(default)]
    pub last_update: Option<i64>,
    /// Whether the marketplace owner currently holds the buy box.
    #[serde(default)]
    pub buy_box_is_amazon: Option<bool>,
}

impl RawStats {
    fn lookup(slot: &Option<Vec<i64>>, code: SeriesCode) -> Option<i64> {
        slot.as_ref()
            .and_then(|arr| arr.get(code.index()).copied())
            .filter(|v| is_real_value(*v))
    }

    pub fn current(&self, code: SeriesCode) -> Option<i64> {
        Self::lookup(&self.current, code)
    }

    pub fn avg30(&self, code: SeriesCode) -> Option<i64> {
        Self::lookup(&self.avg30, code)
    }

    pub fn avg90(&self, code: SeriesCode) -> Option<i64> {
        Self::lookup(&self.avg90, code)
    }

    pub fn last_update_utc(&self) -> Option<DateTime<Utc>> {
        self.last_update.and_then(provider_minutes_to_utc)
    }
}

/// Raw product document from the provider, in whatever state it arrived.
///
/// Sparse is normal: any field except `asin` may be missing, and history
/// arrays are NOT guaranteed chronological.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(default)]
    pub asin: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Package weight in grams.
    #[serde(default)]
    pub package_weight: Option<i64>,
    /// History arrays indexed by [`SeriesCode::index`], each a flat
    /// alternating (minute, value) list. Slots may be null or absent.
    #[serde(default)]
    pub csv: Option<Vec<Option<Vec<i64>>>>,
    #[serde(default)]
    pub stats: Option<RawStats>,
}

impl RawProduct {
    /// Whether the payload has any usable structure at all. A payload with
    /// neither history nor stats is malformed, not sparse.
    pub fn has_structure(&self) -> bool {
        self.csv.is_some() || self.stats.is_some()
    }

    /// Raw samples for one series, still unsorted and sentinel-laden.
    /// An odd trailing element (truncated pair) is dropped.
    pub fn samples(&self, code: SeriesCode) -> Vec<RawSample> {
        let Some(flat) = self
            .csv
            .as_ref()
            .and_then(|csv| csv.get(code.index()))
            .and_then(|slot| slot.as_ref())
        else {
            return Vec::new();
        };

        flat.chunks_exact(2)
            .map(|pair| RawSample {
                minute: pair[0],
                value: pair[1],
            })
            .collect()
    }

    pub fn weight_kg(&self) -> Option<Decimal> {
        self.package_weight
            .filter(|g| *g > 0)
            .map(|g| Decimal::new(g, 3))
    }
}
