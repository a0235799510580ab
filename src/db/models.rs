//! Row types read back with `sqlx::query_as`, matching `migrations/0001_init.sql`.

use chrono::{DateTime, Utc};

use crate::types::Prediction;

#[derive(Debug, sqlx::FromRow)]
pub struct PredictionRow {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub match_time: DateTime<Utc>,
    pub prediction_type: String,
    pub prediction_value: String,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PredictionRow> for Prediction {
    fn from(r: PredictionRow) -> Self {
        Prediction {
            id: r.id,
            home_team: r.home_team,
            away_team: r.away_team,
            match_time: r.match_time,
            prediction_type: r.prediction_type,
            prediction_value: r.prediction_value,
            source: r.source,
            created_at: r.created_at,
        }
    }
}
