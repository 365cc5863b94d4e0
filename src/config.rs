//! Configuration loading.
//!
//! One TOML file, section per subsystem, with serde defaults for every
//! tunable so a minimal file only needs provider credentials. Environment
//! variables prefixed `BOOKFLIP_` override file values
//! (e.g. `BOOKFLIP_PROVIDER__API_KEY`).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ingest::SeriesCode;
use crate::scoring::{FeeSchedule, RiskWeights};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub fees: FeeSchedule,
}

/// Market-data provider access.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    /// Global token budget shared by all concurrent requests.
    #[serde(default = "default_tokens_per_minute")]
    pub tokens_per_minute: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_tokens_per_minute() -> u32 {
    20
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/bookflip.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Scoring and resolution tunables.
///
/// Series precedence is data, not control flow: reordering which named
/// series outranks which is a config edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_velocity_window")]
    pub velocity_window: usize,
    #[serde(default = "default_freshness_ceiling_days")]
    pub freshness_ceiling_days: i64,
    /// Price sources, most trustworthy first.
    #[serde(default = "default_price_series")]
    pub price_series: Vec<SeriesCode>,
    /// Seller-count sources, most trustworthy first.
    #[serde(default = "default_seller_series")]
    pub seller_series: Vec<SeriesCode>,
    #[serde(default = "default_dedicated_confidence")]
    pub dedicated_confidence: f64,
    #[serde(default = "default_series_confidence")]
    pub series_confidence: f64,
    #[serde(default = "default_rolling_confidence")]
    pub rolling_confidence: f64,
    #[serde(default)]
    pub risk_weights: RiskWeights,
}

fn default_velocity_window() -> usize {
    7
}
fn default_freshness_ceiling_days() -> i64 {
    365
}
fn default_price_series() -> Vec<SeriesCode> {
    vec![SeriesCode::Amazon, SeriesCode::New, SeriesCode::ListPrice]
}
fn default_seller_series() -> Vec<SeriesCode> {
    vec![SeriesCode::OfferCountNew, SeriesCode::OfferCountUsed]
}
fn default_dedicated_confidence() -> f64 {
    0.90
}
fn default_series_confidence() -> f64 {
    0.70
}
fn default_rolling_confidence() -> f64 {
    0.45
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            velocity_window: default_velocity_window(),
            freshness_ceiling_days: default_freshness_ceiling_days(),
            price_series: default_price_series(),
            seller_series: default_seller_series(),
            dedicated_confidence: default_dedicated_confidence(),
            series_confidence: default_series_confidence(),
            rolling_confidence: default_rolling_confidence(),
            risk_weights: RiskWeights::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file plus `BOOKFLIP_*` environment overrides.
    pub fn load(path: &str) -> Result<Config> {
        let path = shellexpand::tilde(path).into_owned();
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(&path))
            .add_source(config::Environment::with_prefix("BOOKFLIP").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_analytics_defaults() {
        let cfg: AnalyticsConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.velocity_window, 7);
        assert_eq!(cfg.freshness_ceiling_days, 365);
        assert_eq!(
            cfg.price_series,
            vec![SeriesCode::Amazon, SeriesCode::New, SeriesCode::ListPrice]
        );
        assert_eq!(cfg.dedicated_confidence, 0.90);
        assert_eq!(cfg.rolling_confidence, 0.45);
    }

    #[test]
    fn test_series_precedence_from_toml() {
        let cfg: AnalyticsConfig = toml::from_str(
            r#"
price_series = ["new", "amazon"]
velocity_window = 14
"#,
        )
        .unwrap();
        assert_eq!(cfg.price_series, vec![SeriesCode::New, SeriesCode::Amazon]);
        assert_eq!(cfg.velocity_window, 14);
        // untouched fields keep defaults
        assert_eq!(cfg.freshness_ceiling_days, 365);
    }

    #[test]
    fn test_provider_config_defaults() {
        let cfg: ProviderConfig = toml::from_str(
            r#"
base_url = "https://api.example.com"
api_key = "k"
"#,
        )
        .unwrap();
        assert_eq!(cfg.tokens_per_minute, 20);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn test_fee_schedule_from_toml() {
        let fees: FeeSchedule = toml::from_str(
            r#"
[default]
referral_pct = 0.15
closing_fee = 1.80

[categories.books]
referral_pct = 0.15
closing_fee = 1.80
per_kg_fee = 0.40

[categories.textbooks]
closing_fee = 2.50
"#,
        )
        .unwrap();
        assert_eq!(fees.for_category(Some("books")).closing_fee, dec!(1.80));
        assert_eq!(
            fees.for_category(Some("textbooks")).closing_fee,
            dec!(2.50)
        );
        // unknown category falls back to default
        assert_eq!(fees.for_category(Some("dvds")).referral_pct, dec!(0.15));
    }

    #[test]
    fn test_risk_weights_from_toml() {
        let cfg: AnalyticsConfig = toml::from_str(
            r#"
[risk_weights]
owner = 0.40
sellers = 0.15
"#,
        )
        .unwrap();
        assert_eq!(cfg.risk_weights.owner, 0.40);
        assert_eq!(cfg.risk_weights.sellers, 0.15);
        // unspecified weights keep their defaults
        assert_eq!(cfg.risk_weights.volatility, 0.20);
    }

    #[test]
    fn test_server_and_database_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.bind, "127.0.0.1:8080");
        let db = DatabaseConfig::default();
        assert_eq!(db.path, "data/bookflip.db");
    }
}
