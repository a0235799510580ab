use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Logical key shared by a prediction and its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchIdentity {
    pub home_team: String,
    pub away_team: String,
    pub match_time: DateTime<Utc>,
}

impl std::fmt::Display for MatchIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} vs {} @ {}",
            self.home_team,
            self.away_team,
            self.match_time.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub match_time: DateTime<Utc>,
    /// e.g. "btts"
    pub prediction_type: String,
    /// Free-form: "Yes", "No", or an odds value.
    pub prediction_value: String,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    pub fn identity(&self) -> MatchIdentity {
        MatchIdentity {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            match_time: self.match_time,
        }
    }
}

/// A prediction as discovered by ingestion, before it has a row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub home_team: String,
    pub away_team: String,
    pub match_time: DateTime<Utc>,
    pub prediction_type: String,
    pub prediction_value: String,
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Extracted records
// ---------------------------------------------------------------------------

/// Raw match observation from a results page, prior to matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub home_team: String,
    pub away_team: String,
    pub match_time: Option<DateTime<Utc>>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status: String,
}

impl ExtractedRecord {
    pub fn scores(&self) -> Scores {
        Scores {
            home: self.home_score,
            away: self.away_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub home: Option<i32>,
    pub away: Option<i32>,
}

impl Scores {
    /// Both scores, when known.
    pub fn known(&self) -> Option<(i32, i32)> {
        Some((self.home?, self.away?))
    }
}

impl std::fmt::Display for Scores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = |s: Option<i32>| s.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        write!(f, "{}:{}", side(self.home), side(self.away))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub analyzed: i64,
    pub correct: i64,
}

impl AccuracyStats {
    /// Fraction of analysed predictions that were correct, `None` before any analysis.
    pub fn hit_rate(&self) -> Option<f64> {
        if self.analyzed == 0 {
            None
        } else {
            Some(self.correct as f64 / self.analyzed as f64)
        }
    }
}
