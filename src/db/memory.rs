//! In-process `Store` with the same identity and upsert semantics as `PgStore`,
//! plus switches for injecting storage failures.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::store::Store;
use crate::error::{AppError, Result};
use crate::types::{AccuracyStats, MatchIdentity, NewPrediction, Prediction, Scores, UpsertOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub identity: MatchIdentity,
    pub scores: Scores,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    predictions: Vec<Prediction>,
    results: Vec<StoredResult>,
    analysis: Vec<(i64, bool)>,
    next_id: i64,
    failing_upserts: u32,
    failing_analysis: u32,
    failing_reads: u32,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a prediction row directly, returning its id.
    pub fn add_prediction(
        &self,
        home: &str,
        away: &str,
        match_time: DateTime<Utc>,
        prediction_type: &str,
        value: &str,
    ) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.predictions.push(Prediction {
            id,
            home_team: home.to_string(),
            away_team: away.to_string(),
            match_time,
            prediction_type: prediction_type.to_string(),
            prediction_value: value.to_string(),
            source: None,
            created_at: match_time,
        });
        id
    }

    /// The next `n` upserts fail with a storage error.
    pub fn fail_next_upserts(&self, n: u32) {
        self.inner.lock().unwrap().failing_upserts = n;
    }

    /// The next `n` analysis writes fail with a storage error.
    pub fn fail_next_analysis(&self, n: u32) {
        self.inner.lock().unwrap().failing_analysis = n;
    }

    /// The next `n` accuracy reads fail with a storage error.
    pub fn fail_next_reads(&self, n: u32) {
        self.inner.lock().unwrap().failing_reads = n;
    }

    pub fn results(&self) -> Vec<StoredResult> {
        self.inner.lock().unwrap().results.clone()
    }

    pub fn analysis(&self) -> Vec<(i64, bool)> {
        self.inner.lock().unwrap().analysis.clone()
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.inner.lock().unwrap().predictions.clone()
    }
}

fn same_identity(p: &Prediction, id: &MatchIdentity) -> bool {
    p.home_team == id.home_team && p.away_team == id.away_team && p.match_time == id.match_time
}

#[async_trait]
impl Store for MemoryStore {
    async fn pending_predictions(&self, now: DateTime<Utc>) -> Result<Vec<Prediction>> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<Prediction> = inner
            .predictions
            .iter()
            .filter(|p| p.match_time < now)
            .filter(|p| !inner.results.iter().any(|r| same_identity(p, &r.identity)))
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.match_time.cmp(&a.match_time).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn upsert_result(
        &self,
        identity: &MatchIdentity,
        scores: Scores,
        status: &str,
    ) -> Result<UpsertOutcome> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_upserts > 0 {
            inner.failing_upserts -= 1;
            return Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut));
        }
        let now = Utc::now();
        if let Some(existing) = inner.results.iter_mut().find(|r| &r.identity == identity) {
            existing.scores = scores;
            existing.status = status.to_string();
            existing.updated_at = now;
            return Ok(UpsertOutcome::Updated);
        }
        inner.results.push(StoredResult {
            identity: identity.clone(),
            scores,
            status: status.to_string(),
            updated_at: now,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn record_analysis(&self, prediction_id: i64, is_correct: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_analysis > 0 {
            inner.failing_analysis -= 1;
            return Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut));
        }
        inner.analysis.push((prediction_id, is_correct));
        Ok(())
    }

    async fn insert_prediction(&self, p: &NewPrediction) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let id = MatchIdentity {
            home_team: p.home_team.clone(),
            away_team: p.away_team.clone(),
            match_time: p.match_time,
        };
        if inner.predictions.iter().any(|existing| same_identity(existing, &id)) {
            return Ok(false);
        }
        inner.next_id += 1;
        let row_id = inner.next_id;
        inner.predictions.push(Prediction {
            id: row_id,
            home_team: p.home_team.clone(),
            away_team: p.away_team.clone(),
            match_time: p.match_time,
            prediction_type: p.prediction_type.clone(),
            prediction_value: p.prediction_value.clone(),
            source: p.source.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn accuracy(&self) -> Result<AccuracyStats> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_reads > 0 {
            inner.failing_reads -= 1;
            return Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(AccuracyStats {
            analyzed: inner.analysis.len() as i64,
            correct: inner.analysis.iter().filter(|(_, ok)| *ok).count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 23, 18, 0, 0).unwrap()
    }

    fn identity(home: &str, away: &str) -> MatchIdentity {
        MatchIdentity {
            home_team: home.to_string(),
            away_team: away.to_string(),
            match_time: kickoff(),
        }
    }

    #[tokio::test]
    async fn second_upsert_overwrites_first() {
        let store = MemoryStore::new();
        let id = identity("Team A", "Team B");

        let first = store
            .upsert_result(&id, Scores { home: Some(1), away: Some(1) }, "Finished")
            .await
            .unwrap();
        let second = store
            .upsert_result(&id, Scores { home: Some(2), away: Some(1) }, "Finished")
            .await
            .unwrap();

        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::Updated);
        let results = store.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scores.home, Some(2));
    }

    #[tokio::test]
    async fn pending_never_includes_resolved_predictions() {
        let store = MemoryStore::new();
        let now = kickoff() + Duration::hours(4);
        store.add_prediction("Team A", "Team B", kickoff(), "btts", "Yes");
        store.add_prediction("Team C", "Team D", kickoff() - Duration::days(1), "btts", "Yes");
        store.add_prediction("Team E", "Team F", now + Duration::hours(2), "btts", "Yes");

        let pending = store.pending_predictions(now).await.unwrap();
        let homes: Vec<_> = pending.iter().map(|p| p.home_team.as_str()).collect();
        assert_eq!(homes, vec!["Team A", "Team C"], "latest kickoff first, future excluded");

        store
            .upsert_result(&identity("Team A", "Team B"), Scores { home: Some(0), away: Some(0) }, "Finished")
            .await
            .unwrap();
        let pending = store.pending_predictions(now).await.unwrap();
        assert!(pending.iter().all(|p| p.home_team != "Team A"));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn insert_prediction_is_idempotent_per_identity() {
        let store = MemoryStore::new();
        let p = NewPrediction {
            home_team: "Team A".to_string(),
            away_team: "Team B".to_string(),
            match_time: kickoff(),
            prediction_type: "btts".to_string(),
            prediction_value: "Yes".to_string(),
            source: Some("scores24.live".to_string()),
        };
        assert!(store.insert_prediction(&p).await.unwrap());
        assert!(!store.insert_prediction(&p).await.unwrap());
        assert_eq!(store.predictions().len(), 1);
    }
}
