//! Market-data provider client.
//!
//! Fetches raw product documents over REST. The trait seam exists so the
//! batch runner and the server can be tested without a network; the real
//! client layers the shared token budget, timeouts and retry policy on
//! top of plain reqwest.

pub mod budget;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{AppError, Result};
use crate::ingest::RawProduct;

pub use budget::TokenBudget;

/// Anything that can produce a raw product document for an ASIN.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_product(&self, asin: &str) -> Result<RawProduct>;
}

/// Provider response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductResponse {
    #[serde(default)]
    products: Vec<RawProduct>,
    #[serde(default)]
    tokens_left: Option<f64>,
}

pub struct HttpProductClient {
    http: Client,
    base_url: String,
    api_key: String,
    budget: Arc<TokenBudget>,
    max_retries: u32,
}

impl HttpProductClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            budget: Arc::new(TokenBudget::new(cfg.tokens_per_minute)),
            max_retries: cfg.max_retries,
        })
    }

    pub fn budget(&self) -> Arc<TokenBudget> {
        Arc::clone(&self.budget)
    }

    fn backoff(attempt: u32) -> Duration {
        let base = 500u64.saturating_mul(1 << attempt.min(6));
        let jitter = rand::rng().random_range(0..250);
        Duration::from_millis(base + jitter)
    }

    async fn fetch_once(&self, asin: &str) -> Result<ProductResponse> {
        let url = format!("{}/product", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("asin", asin)])
            .send()
            .await?;

        if let Some(left) = resp
            .headers()
            .get("x-tokens-left")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.budget.sync_remaining(left);
        }

        match resp.status() {
            StatusCode::NOT_FOUND => Err(AppError::ProductNotFound(asin.to_string())),
            s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
                Err(AppError::Provider(format!("status {s}")))
            }
            s if !s.is_success() => Err(AppError::Provider(format!("status {s}"))),
            _ => Ok(resp.json::<ProductResponse>().await?),
        }
    }

    fn retryable(err: &AppError) -> bool {
        match err {
            AppError::Provider(_) => true,
            AppError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[async_trait]
impl ProductSource for HttpProductClient {
    async fn fetch_product(&self, asin: &str) -> Result<RawProduct> {
        self.budget.acquire(1).await;

        let mut attempt = 0;
        let response = loop {
            match self.fetch_once(asin).await {
                Ok(resp) => break resp,
                Err(e) if Self::retryable(&e) && attempt < self.max_retries => {
                    let wait = Self::backoff(attempt);
                    warn!(
                        asin,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "provider request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(left) = response.tokens_left {
            self.budget.sync_remaining(left);
        }

        let product = response
            .products
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ProductNotFound(asin.to_string()))?;

        debug!(asin, "fetched product payload");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        toml::from_str(
            r#"
base_url = "https://api.example.com/"
api_key = "test-key"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpProductClient::new(&config()).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let a = HttpProductClient::backoff(0);
        let b = HttpProductClient::backoff(2);
        assert!(a >= Duration::from_millis(500));
        assert!(b >= Duration::from_millis(2000));
        // exponent is capped, no overflow at absurd attempt counts
        let c = HttpProductClient::backoff(40);
        assert!(c <= Duration::from_millis(32_000 + 250));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HttpProductClient::retryable(&AppError::Provider(
            "status 503".to_string()
        )));
        assert!(!HttpProductClient::retryable(&AppError::ProductNotFound(
            "B000X".to_string()
        )));
        assert!(!HttpProductClient::retryable(&AppError::MalformedPayload(
            "bad".to_string()
        )));
    }

    #[test]
    fn test_envelope_parsing() {
        let resp: ProductResponse = serde_json::from_str(
            r#"{"products": [{"asin": "B000TEST01"}], "tokensLeft": 17.5}"#,
        )
        .unwrap();
        assert_eq!(resp.products.len(), 1);
        assert_eq!(resp.tokens_left, Some(17.5));

        let empty: ProductResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.products.is_empty());
    }
}
