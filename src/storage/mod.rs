//! Analysis persistence.
//!
//! A thin sqlite cache of finished analyses: scalar columns for the fields
//! the API filters and sorts on, the full record as JSON alongside.
//! Records are immutable, so the table is insert-only: a re-analysis
//! inserts a new row and readers take the newest.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::Result;
use crate::types::AnalysisRecord;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS analyses (
    id              TEXT PRIMARY KEY,
    asin            TEXT NOT NULL,
    analyzed_at     TEXT NOT NULL,
    velocity        INTEGER NOT NULL,
    stability       INTEGER NOT NULL,
    data_confidence INTEGER NOT NULL,
    risk            INTEGER NOT NULL,
    risk_tier       TEXT NOT NULL,
    profit_tier     TEXT,
    roi_percent     TEXT,
    record          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_analyses_asin ON analyses(asin, analyzed_at DESC);
"#;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating file and parent directory if needed) and migrate.
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(path, "database ready");
        Ok(Self { pool })
    }

    pub async fn save(&self, record: &AnalysisRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO analyses
                (id, asin, analyzed_at, velocity, stability, data_confidence,
                 risk, risk_tier, profit_tier, roi_percent, record)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.asin)
        .bind(record.analyzed_at.to_rfc3339())
        .bind(i64::from(record.velocity.score))
        .bind(i64::from(record.stability.score))
        .bind(i64::from(record.data_confidence.score))
        .bind(i64::from(record.risk.score))
        .bind(&record.risk.tier)
        .bind(record.profitability.as_ref().map(|p| p.tier.to_string()))
        .bind(
            record
                .profitability
                .as_ref()
                .and_then(|p| p.roi_percent)
                .map(|r| r.to_string()),
        )
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Newest stored analysis for one ASIN.
    pub async fn latest_for_asin(&self, asin: &str) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query(
            "SELECT record FROM analyses WHERE asin = ? ORDER BY analyzed_at DESC LIMIT 1",
        )
        .bind(asin)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let json: String = row.get("record");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    /// Most recent analyses across all ASINs.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query("SELECT record FROM analyses ORDER BY analyzed_at DESC LIMIT ?")
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let json: String = row.get("record");
                Ok(serde_json::from_str(&json)?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricSnapshot, ScoreResult};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn record(asin: &str, age_hours: i64) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            asin: asin.to_string(),
            analyzed_at: Utc::now() - Duration::hours(age_hours),
            price: MetricSnapshot::unresolved(),
            sales_rank: MetricSnapshot::unresolved(),
            seller_count: MetricSnapshot::unresolved(),
            velocity: ScoreResult::new("velocity", 47, "flat"),
            stability: ScoreResult::new("stability", 88, "stable"),
            data_confidence: ScoreResult::new("data_confidence", 60, "moderate"),
            risk: ScoreResult::new("risk", 35, "MEDIUM"),
            profitability: None,
            flags: vec!["price unresolved from any source".to_string()],
        }
    }

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let (_dir, db) = test_db().await;
        let rec = record("B000TEST01", 0);
        db.save(&rec).await.unwrap();

        let loaded = db.latest_for_asin("B000TEST01").await.unwrap().unwrap();
        assert_eq!(loaded.id, rec.id);
        assert_eq!(loaded.velocity.score, 47);
        assert_eq!(loaded.flags, rec.flags);
    }

    #[tokio::test]
    async fn test_latest_picks_newest() {
        let (_dir, db) = test_db().await;
        let older = record("B000TEST01", 5);
        let newer = record("B000TEST01", 1);
        db.save(&older).await.unwrap();
        db.save(&newer).await.unwrap();

        let loaded = db.latest_for_asin("B000TEST01").await.unwrap().unwrap();
        assert_eq!(loaded.id, newer.id);
    }

    #[tokio::test]
    async fn test_missing_asin_is_none() {
        let (_dir, db) = test_db().await;
        assert!(db.latest_for_asin("B000NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_ordering_and_limit() {
        let (_dir, db) = test_db().await;
        for (asin, hours) in [("B000A", 3), ("B000B", 2), ("B000C", 1)] {
            db.save(&record(asin, hours)).await.unwrap();
        }

        let recent = db.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].asin, "B000C");
        assert_eq!(recent[1].asin, "B000B");
    }
}
