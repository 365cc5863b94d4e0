//! Error types for the analytics backend.
//!
//! The scoring core is total over its numeric domain: missing data and
//! degenerate statistics are reported as data (flags, `ValueSource::None`,
//! neutral scores), never as errors. Only structural problems at the
//! boundary surface here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Payload is structurally unusable (not merely sparse). Batch runners
    /// must catch this per item so one bad payload does not abort siblings.
    #[error("malformed product payload: {0}")]
    MalformedPayload(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Provider-side failure after retries (HTTP status, budget exhaustion,
    /// unparseable body).
    #[error("provider error: {0}")]
    Provider(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
