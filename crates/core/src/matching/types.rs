use serde::{Deserialize, Serialize};

use crate::domain::catalog::CatalogEntry;

/// Which signal produced a match. Priority breaks score ties: an exact SKU
/// hit always outranks a cross-reference, which outranks a fuzzy name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactSku,
    CrossReference,
    FuzzyName,
    None,
}

impl MatchType {
    pub fn priority(&self) -> u8 {
        match self {
            MatchType::ExactSku => 3,
            MatchType::CrossReference => 2,
            MatchType::FuzzyName => 1,
            MatchType::None => 0,
        }
    }
}

/// One catalog entry proposed for a candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub entry: CatalogEntry,
    /// Confidence in [0, 1].
    pub score: f64,
    pub match_type: MatchType,
    /// Reviewer-facing explanation of why this entry was proposed.
    pub reasoning: String,
}

/// Ordered matches for one candidate, strongest first, capped at top-N.
/// An empty list is a valid terminal state ("needs manual entry").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matches: Vec<ScoredMatch>,
}

impl MatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn best(&self) -> Option<&ScoredMatch> {
        self.matches.first()
    }

    pub fn match_type(&self) -> MatchType {
        self.best().map(|found| found.match_type).unwrap_or(MatchType::None)
    }
}
