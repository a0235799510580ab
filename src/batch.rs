use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::RetryPolicy;
use crate::db::{with_retry, Store};
use crate::error::{ErrorKind, Result};
use crate::extractor::Extractor;
use crate::matcher::Matcher;
use crate::reconciler::{ReconcileSummary, Reconciler};
use crate::types::{AccuracyStats, ExtractedRecord, NewPrediction};

/// `today`, then each earlier day until `days` dates are listed.
pub fn lookback_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days.max(1))
        .map(|back| today - Duration::days(i64::from(back)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub dates_fetched: usize,
    pub dates_failed: usize,
    pub records: usize,
    pub pending: usize,
    pub inserted: usize,
    pub updated: usize,
    pub analyzed: usize,
    pub correct: usize,
    pub not_found: usize,
    pub failed: usize,
    pub analysis_failed: usize,
}

impl BatchSummary {
    fn absorb(&mut self, r: ReconcileSummary) {
        self.inserted = r.inserted;
        self.updated = r.updated;
        self.analyzed = r.analyzed;
        self.correct = r.correct;
        self.not_found = r.not_found;
        self.failed = r.failed;
        self.analysis_failed = r.analysis_failed;
    }

    pub fn log(&self) {
        info!(
            event = "BATCH_DONE",
            dates_fetched = self.dates_fetched,
            dates_failed = self.dates_failed,
            records = self.records,
            pending = self.pending,
            "Batch complete | inserted: {} | updated: {} | analyzed: {} | correct: {} | not found: {} | failed: {} | analysis failed: {}",
            self.inserted,
            self.updated,
            self.analyzed,
            self.correct,
            self.not_found,
            self.failed,
            self.analysis_failed,
        );
    }
}

/// One reconciliation run: fetch every date, then resolve pending predictions.
pub struct Batch<'a> {
    store: &'a dyn Store,
    extractor: &'a dyn Extractor,
    matcher: Matcher,
    retry: RetryPolicy,
}

impl<'a> Batch<'a> {
    pub fn new(
        store: &'a dyn Store,
        extractor: &'a dyn Extractor,
        matcher: Matcher,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            extractor,
            matcher,
            retry,
        }
    }

    /// Fetch failures skip their date. The only error returned is a pending-predictions
    /// query that still fails after retries, since nothing can be reconciled without it.
    pub async fn run(&self, dates: &[NaiveDate], now: DateTime<Utc>) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        let records = self.collect_records(dates, &mut summary).await;
        summary.records = records.len();

        let pending = with_retry(self.retry, "pending_predictions", || {
            self.store.pending_predictions(now)
        })
        .await?;
        summary.pending = pending.len();
        info!(
            "{} pending predictions, {} extracted records from {} dates",
            pending.len(),
            records.len(),
            summary.dates_fetched
        );

        if !pending.is_empty() {
            let reconciled = Reconciler::new(self.store, self.matcher, self.retry)
                .reconcile(&pending, &records)
                .await;
            summary.absorb(reconciled);
        }
        Ok(summary)
    }

    /// Records from every date that could be fetched, in date order.
    async fn collect_records(
        &self,
        dates: &[NaiveDate],
        summary: &mut BatchSummary,
    ) -> Vec<ExtractedRecord> {
        let mut records = Vec::new();
        for &date in dates {
            match self.extractor.fetch(date).await {
                Ok(mut day) => {
                    summary.dates_fetched += 1;
                    records.append(&mut day);
                }
                Err(e) => {
                    summary.dates_failed += 1;
                    let stage = match e.kind() {
                        ErrorKind::Fetch => "fetch",
                        ErrorKind::Parse => "parse",
                        _ => "extract",
                    };
                    warn!(%date, stage, "Skipping date: {e}");
                }
            }
        }
        records
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub added: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Insert each prediction unless its identity is already stored. Storage failures
/// are retried, then logged and counted.
pub async fn ingest_predictions(
    store: &dyn Store,
    predictions: &[NewPrediction],
    retry: RetryPolicy,
) -> IngestSummary {
    let mut summary = IngestSummary::default();
    for p in predictions {
        match with_retry(retry, "insert_prediction", || store.insert_prediction(p)).await {
            Ok(true) => {
                info!(home = %p.home_team, away = %p.away_team, match_time = %p.match_time, "Prediction added");
                summary.added += 1;
            }
            Ok(false) => summary.existing += 1,
            Err(e) => {
                warn!(home = %p.home_team, away = %p.away_team, "Prediction not stored: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Analysed/correct totals, read under the same retry policy as writes.
pub async fn accuracy_report(store: &dyn Store, retry: RetryPolicy) -> Result<AccuracyStats> {
    with_retry(retry, "accuracy", || store.accuracy()).await
}
