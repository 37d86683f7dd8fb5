//! Match Scorer: candidate line items against the catalog index.
//!
//! Three signals are checked per candidate — exact SKU, competitor
//! cross-reference, fuzzy name overlap — and the strongest results kept.

mod scorer;
mod types;

pub use scorer::MatchScorer;
pub use types::{MatchResult, MatchType, ScoredMatch};

/// Score assigned to an exact SKU hit.
pub const EXACT_SKU_SCORE: f64 = 1.0;

/// Score assigned to a cross-reference hit.
pub const CROSS_REFERENCE_SCORE: f64 = 0.95;

/// Fuzzy matches below this floor are excluded entirely, never returned as
/// low-confidence guesses.
pub const DEFAULT_FUZZY_FLOOR: f64 = 0.3;

/// Matches retained per candidate.
pub const DEFAULT_TOP_N: usize = 5;
