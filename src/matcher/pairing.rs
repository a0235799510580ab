use crate::matcher::normalize::NameMode;
use crate::types::{ExtractedRecord, Prediction};

/// Pairs stored predictions with extracted records by team name.
///
/// Names match when either normalised form contains the other, for home and away
/// independently. This tolerates suffixes like "FC" or "Utd" at the cost of
/// precision: "Sporting" sits inside both "Sporting CP" and "Sporting Gijón", and
/// whichever comes first in the candidate list wins.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    mode: NameMode,
}

impl Matcher {
    pub fn new(mode: NameMode) -> Self {
        Self { mode }
    }

    /// First candidate, in list order, whose home and away names both match.
    /// A name that normalises to nothing never matches.
    pub fn find_match<'a>(
        &self,
        prediction: &Prediction,
        candidates: &'a [ExtractedRecord],
    ) -> Option<&'a ExtractedRecord> {
        let home = self.mode.apply(&prediction.home_team);
        let away = self.mode.apply(&prediction.away_team);
        if home.is_empty() || away.is_empty() {
            return None;
        }

        candidates.iter().find(|candidate| {
            let cand_home = self.mode.apply(&candidate.home_team);
            let cand_away = self.mode.apply(&candidate.away_team);
            names_overlap(&home, &cand_home) && names_overlap(&away, &cand_away)
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(NameMode::Strict)
    }
}

/// Substring containment in either direction. Both sides are already normalised.
fn names_overlap(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}
