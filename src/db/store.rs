use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use crate::config::{DbConfig, DB_MAX_CONNECTIONS};
use crate::db::models::PredictionRow;
use crate::error::Result;
use crate::types::{AccuracyStats, MatchIdentity, NewPrediction, Prediction, Scores, UpsertOutcome};

/// Persistence surface used by the reconciler and the ingest/report commands.
///
/// Every write is a single statement, so a result row is never left with scores
/// from one observation and a status from another.
#[async_trait]
pub trait Store: Send + Sync {
    /// Predictions kicked off before `now` with no result under the same identity,
    /// latest kickoff first.
    async fn pending_predictions(&self, now: DateTime<Utc>) -> Result<Vec<Prediction>>;

    /// Insert the result for `identity`, or overwrite scores and status of the existing one.
    async fn upsert_result(
        &self,
        identity: &MatchIdentity,
        scores: Scores,
        status: &str,
    ) -> Result<UpsertOutcome>;

    /// Append an analysis row. No uniqueness on `prediction_id`.
    async fn record_analysis(&self, prediction_id: i64, is_correct: bool) -> Result<()>;

    /// Insert unless a prediction with the same identity exists. Returns whether a row was added.
    async fn insert_prediction(&self, prediction: &NewPrediction) -> Result<bool>;

    async fn accuracy(&self) -> Result<AccuracyStats>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DB_MAX_CONNECTIONS)
            .connect_with(cfg.connect_options())
            .await?;
        info!(host = %cfg.host, port = cfg.port, database = %cfg.database, "Database connected");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    async fn pending_predictions(&self, now: DateTime<Utc>) -> Result<Vec<Prediction>> {
        let rows: Vec<PredictionRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.home_team, p.away_team, p.match_time,
                   p.prediction_type, p.prediction_value, p.source, p.created_at
            FROM predictions p
            WHERE p.match_time < $1
              AND NOT EXISTS (
                  SELECT 1 FROM results r
                  WHERE r.home_team = p.home_team
                    AND r.away_team = p.away_team
                    AND r.match_time = p.match_time
              )
            ORDER BY p.match_time DESC, p.id ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Prediction::from).collect())
    }

    async fn upsert_result(
        &self,
        identity: &MatchIdentity,
        scores: Scores,
        status: &str,
    ) -> Result<UpsertOutcome> {
        // xmax is 0 only on a freshly inserted tuple.
        let row = sqlx::query(
            r#"
            INSERT INTO results (home_team, away_team, match_time, home_score, away_score, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (home_team, away_team, match_time) DO UPDATE SET
                home_score = EXCLUDED.home_score,
                away_score = EXCLUDED.away_score,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&identity.home_team)
        .bind(&identity.away_team)
        .bind(identity.match_time)
        .bind(scores.home)
        .bind(scores.away)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn record_analysis(&self, prediction_id: i64, is_correct: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO analysis (prediction_id, is_correct, analyzed_at) VALUES ($1, $2, NOW())",
        )
        .bind(prediction_id)
        .bind(is_correct)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_prediction(&self, p: &NewPrediction) -> Result<bool> {
        let done = sqlx::query(
            r#"
            INSERT INTO predictions
                (home_team, away_team, match_time, prediction_type, prediction_value, source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (home_team, away_team, match_time) DO NOTHING
            "#,
        )
        .bind(&p.home_team)
        .bind(&p.away_team)
        .bind(p.match_time)
        .bind(&p.prediction_type)
        .bind(&p.prediction_value)
        .bind(&p.source)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn accuracy(&self) -> Result<AccuracyStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS analyzed,
                   COUNT(*) FILTER (WHERE is_correct) AS correct
            FROM analysis
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AccuracyStats {
            analyzed: row.try_get("analyzed")?,
            correct: row.try_get("correct")?,
        })
    }
}
