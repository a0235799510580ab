use crate::types::{Prediction, Scores};

const YES_WORDS: &[&str] = &["yes", "да", "true", "1"];
const NO_WORDS: &[&str] = &["no", "нет", "false", "0"];

/// A prediction's claim about the final score that can be checked once it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Both teams to score: `true` asserts both score, `false` asserts at least one does not.
    Btts(bool),
}

impl Claim {
    /// `None` when the type is not recognised or the value is not a yes/no word (e.g. an odds value).
    pub fn from_prediction(p: &Prediction) -> Option<Self> {
        if !p.prediction_type.trim().eq_ignore_ascii_case("btts") {
            return None;
        }
        let value = p.prediction_value.trim().to_lowercase();
        if YES_WORDS.contains(&value.as_str()) {
            Some(Claim::Btts(true))
        } else if NO_WORDS.contains(&value.as_str()) {
            Some(Claim::Btts(false))
        } else {
            None
        }
    }

    /// Whether the claim held. `None` when either score is unknown.
    pub fn evaluate(self, scores: Scores) -> Option<bool> {
        let (home, away) = scores.known()?;
        match self {
            Claim::Btts(asserted) => Some((home > 0 && away > 0) == asserted),
        }
    }
}
