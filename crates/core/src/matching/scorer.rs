use std::collections::HashSet;

use crate::catalog::{dice_coefficient, CatalogSnapshot};
use crate::config::MatchingConfig;
use crate::domain::candidate::Candidate;
use crate::domain::catalog::EntryId;

use super::types::{MatchResult, MatchType, ScoredMatch};
use super::{CROSS_REFERENCE_SCORE, DEFAULT_FUZZY_FLOOR, DEFAULT_TOP_N, EXACT_SKU_SCORE};

/// Deterministic match scorer. Pure over its inputs: the same candidate and
/// snapshot always produce the same result.
#[derive(Clone, Copy, Debug)]
pub struct MatchScorer {
    fuzzy_floor: f64,
    top_n: usize,
}

impl MatchScorer {
    pub fn new() -> Self {
        Self { fuzzy_floor: DEFAULT_FUZZY_FLOOR, top_n: DEFAULT_TOP_N }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self { fuzzy_floor: config.fuzzy_floor, top_n: config.top_n }
    }

    pub fn score(&self, candidate: &Candidate, catalog: &CatalogSnapshot) -> MatchResult {
        // An exact SKU hit is definitive; skip all other signals.
        if let Some(sku) = candidate.raw_sku.as_deref() {
            if let Some(entry) = catalog.lookup_by_sku(sku) {
                return MatchResult {
                    matches: vec![ScoredMatch {
                        entry: entry.clone(),
                        score: EXACT_SKU_SCORE,
                        match_type: MatchType::ExactSku,
                        reasoning: format!("Exact SKU match on `{}`", entry.sku),
                    }],
                };
            }
        }

        let mut matches: Vec<ScoredMatch> = Vec::new();
        let mut seen: HashSet<EntryId> = HashSet::new();

        if let Some(sku) = candidate.raw_sku.as_deref() {
            if let Some(entry) = catalog.lookup_by_cross_reference(sku) {
                seen.insert(entry.id.clone());
                matches.push(ScoredMatch {
                    entry: entry.clone(),
                    score: CROSS_REFERENCE_SCORE,
                    match_type: MatchType::CrossReference,
                    reasoning: format!(
                        "Competitor part `{sku}` cross-references our `{}`",
                        entry.sku
                    ),
                });
            }
        }

        for (entry, tokens) in catalog.entries_with_tokens() {
            if seen.contains(&entry.id) {
                continue;
            }
            let score = dice_coefficient(&candidate.normalized_tokens, tokens);
            if score < self.fuzzy_floor {
                continue;
            }
            matches.push(ScoredMatch {
                entry: entry.clone(),
                score,
                match_type: MatchType::FuzzyName,
                reasoning: format!(
                    "Name similarity {:.0}% with `{}`",
                    score * 100.0,
                    entry.display_name
                ),
            });
        }

        // Signal priority first: a cross-reference hit outranks any fuzzy
        // overlap, even a perfect one. Within a signal, score descending,
        // then entry id for a fully deterministic ordering.
        matches.sort_by(|a, b| {
            b.match_type
                .priority()
                .cmp(&a.match_type.priority())
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        matches.truncate(self.top_n);

        MatchResult { matches }
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new()
    }
}
