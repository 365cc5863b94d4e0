//! REST API.
//!
//! Thin transport over the analysis pipeline: handlers fetch, analyze,
//! persist and serialize. All response bodies are the plain serde types
//! from [`crate::types`]: nothing framework-specific leaks out of the
//! core, and nothing here recomputes scores.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyzer::Analyzer;
use crate::client::ProductSource;
use crate::error::{AppError, Result};
use crate::scoring::{profitability, FeeSchedule};
use crate::storage::Database;
use crate::types::Profitability;

pub struct AppState {
    pub analyzer: Analyzer,
    pub source: Arc<dyn ProductSource>,
    pub db: Database,
    pub fees: FeeSchedule,
    pub started_at: Instant,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Provider(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub asin: String,
    #[serde(default)]
    pub acquisition_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProfitRequest {
    pub sell_price: Decimal,
    pub acquisition_cost: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/analyses", get(recent))
        .route("/api/analyses/{asin}", get(latest))
        .route("/api/profitability", post(profit))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind, "API listening");
    axum::serve(listener, router(state))
        .await
        .map_err(AppError::Io)?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse> {
    let raw = state.source.fetch_product(&req.asin).await?;
    let record = state
        .analyzer
        .analyze(&raw, req.acquisition_cost, Utc::now())?;
    state.db.save(&record).await?;
    Ok(Json(record))
}

async fn latest(
    State(state): State<Arc<AppState>>,
    Path(asin): Path<String>,
) -> Result<impl IntoResponse> {
    let record = state
        .db
        .latest_for_asin(&asin)
        .await?
        .ok_or(AppError::ProductNotFound(asin))?;
    Ok(Json(record))
}

async fn recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<impl IntoResponse> {
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    let records = state.db.recent(limit).await?;
    Ok(Json(records))
}

async fn profit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfitRequest>,
) -> Json<Profitability> {
    let fees = state.fees.for_category(req.category.as_deref());
    Json(profitability(
        req.sell_price,
        req.acquisition_cost,
        req.weight_kg,
        fees,
    ))
}
