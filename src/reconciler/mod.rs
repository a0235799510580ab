pub mod verdict;

use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::db::{with_retry, Store};
use crate::error::Result;
use crate::matcher::Matcher;
use crate::types::{ExtractedRecord, Prediction, UpsertOutcome};

use verdict::Claim;

/// What happened to the analysis row after a result was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStep {
    Recorded { is_correct: bool },
    /// The prediction carries no checkable claim, or a score is unknown.
    NotEvaluable,
    /// The result write stands; only the analysis row is missing.
    Failed,
}

/// Terminal state of one pending prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved {
        write: UpsertOutcome,
        analysis: AnalysisStep,
    },
    NotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    pub analyzed: usize,
    pub correct: usize,
    pub not_found: usize,
    pub failed: usize,
    pub analysis_failed: usize,
}

impl ReconcileSummary {
    pub fn record(&mut self, outcome: &Result<Outcome>) {
        match outcome {
            Ok(Outcome::NotFound) => self.not_found += 1,
            Ok(Outcome::Resolved { write, analysis }) => {
                match write {
                    UpsertOutcome::Inserted => self.inserted += 1,
                    UpsertOutcome::Updated => self.updated += 1,
                }
                match analysis {
                    AnalysisStep::Recorded { is_correct } => {
                        self.analyzed += 1;
                        if *is_correct {
                            self.correct += 1;
                        }
                    }
                    AnalysisStep::NotEvaluable => {}
                    AnalysisStep::Failed => self.analysis_failed += 1,
                }
            }
            Err(_) => self.failed += 1,
        }
    }
}

/// Pairs pending predictions with extracted records and persists what it finds.
pub struct Reconciler<'a> {
    store: &'a dyn Store,
    matcher: Matcher,
    retry: RetryPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn Store, matcher: Matcher, retry: RetryPolicy) -> Self {
        Self { store, matcher, retry }
    }

    /// Reconcile every prediction in the given order. Per-item failures are logged
    /// and counted; the pass always runs to the end.
    pub async fn reconcile(
        &self,
        pending: &[Prediction],
        records: &[ExtractedRecord],
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        for prediction in pending {
            let outcome = self.reconcile_one(prediction, records).await;
            if let Err(e) = &outcome {
                warn!(
                    prediction_id = prediction.id,
                    home = %prediction.home_team,
                    away = %prediction.away_team,
                    "Skipping prediction: {e}"
                );
            }
            summary.record(&outcome);
        }
        summary
    }

    pub async fn reconcile_one(
        &self,
        prediction: &Prediction,
        records: &[ExtractedRecord],
    ) -> Result<Outcome> {
        let Some(record) = self.matcher.find_match(prediction, records) else {
            debug!(
                prediction_id = prediction.id,
                home = %prediction.home_team,
                away = %prediction.away_team,
                "No result found"
            );
            return Ok(Outcome::NotFound);
        };

        let identity = prediction.identity();
        let scores = record.scores();
        let write = with_retry(self.retry, "upsert_result", || {
            self.store.upsert_result(&identity, scores, &record.status)
        })
        .await?;

        info!(
            prediction_id = prediction.id,
            home = %prediction.home_team,
            away = %prediction.away_team,
            match_time = %prediction.match_time,
            "Result {write}: {scores} ({})",
            record.status,
        );

        let analysis = match Claim::from_prediction(prediction).and_then(|c| c.evaluate(scores)) {
            None => AnalysisStep::NotEvaluable,
            Some(is_correct) => {
                let recorded = with_retry(self.retry, "record_analysis", || {
                    self.store.record_analysis(prediction.id, is_correct)
                })
                .await;
                match recorded {
                    Ok(()) => {
                        info!(prediction_id = prediction.id, is_correct, "Prediction analysed");
                        AnalysisStep::Recorded { is_correct }
                    }
                    Err(e) => {
                        warn!(prediction_id = prediction.id, "Analysis not recorded: {e}");
                        AnalysisStep::Failed
                    }
                }
            }
        };

        Ok(Outcome::Resolved { write, analysis })
    }
}
