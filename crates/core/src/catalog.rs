//! Catalog Index: read-mostly lookup structure over the product catalog.
//!
//! `load` builds a complete immutable snapshot and swaps it in atomically, so
//! concurrent readers never observe a half-loaded index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::catalog::{CatalogEntry, CrossReference};
use crate::errors::{DataQualityWarning, DomainError};
use crate::normalize::{canonical_name, name_tokens};

/// Outcome of a bulk load. Malformed rows are dropped and counted, never
/// fatal: bulk input files are routinely partially bad.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub entries_loaded: usize,
    pub entries_dropped: usize,
    pub cross_references_loaded: usize,
    pub cross_references_dropped: usize,
    pub warnings: Vec<DataQualityWarning>,
}

/// Immutable view of one catalog load. Sessions capture a snapshot at the
/// start of matching so every candidate in a batch sees the same catalog.
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
    tokens: Vec<Vec<String>>,
    by_sku: HashMap<String, usize>,
    by_competitor_sku: HashMap<String, usize>,
}

impl CatalogSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact SKU lookup: case-insensitive, trimmed.
    pub fn lookup_by_sku(&self, sku: &str) -> Option<&CatalogEntry> {
        self.by_sku.get(&sku_key(sku)).map(|index| &self.entries[*index])
    }

    /// Resolves a competitor part number to the owning entry. Unmapped
    /// numbers return None; that is an expected miss, not an error.
    pub fn lookup_by_cross_reference(&self, competitor_sku: &str) -> Option<&CatalogEntry> {
        self.by_competitor_sku.get(&sku_key(competitor_sku)).map(|index| &self.entries[*index])
    }

    /// Entries ordered by descending token overlap with the query, strongest
    /// first, zero-overlap entries excluded.
    pub fn search_by_name(&self, query: &str, limit: usize) -> Vec<&CatalogEntry> {
        let query_tokens = name_tokens(query);
        let mut scored: Vec<(usize, f64)> = self
            .tokens
            .iter()
            .enumerate()
            .map(|(index, tokens)| (index, dice_coefficient(&query_tokens, tokens)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.entries[a.0].id.cmp(&self.entries[b.0].id))
        });
        scored.into_iter().take(limit).map(|(index, _)| &self.entries[index]).collect()
    }

    /// Every entry with its precomputed token set, for fuzzy scoring.
    pub fn entries_with_tokens(&self) -> impl Iterator<Item = (&CatalogEntry, &[String])> {
        self.entries.iter().zip(self.tokens.iter().map(Vec::as_slice))
    }
}

/// Dice set-similarity over two sorted, deduplicated token slices:
/// `2|A∩B| / (|A|+|B|)`. Symmetric by construction.
pub fn dice_coefficient(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut intersection = 0usize;
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                intersection += 1;
                i += 1;
                j += 1;
            }
        }
    }
    (2 * intersection) as f64 / (a.len() + b.len()) as f64
}

/// Thread-safe handle over the current snapshot. Readers clone an `Arc` and
/// keep working against it even while a reload swaps in a new snapshot.
#[derive(Default)]
pub struct CatalogIndex {
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index contents atomically. Rows missing a SKU and
    /// cross-references pointing at unknown SKUs are dropped with a warning.
    pub fn load(
        &self,
        entries: Vec<CatalogEntry>,
        cross_references: Vec<CrossReference>,
    ) -> LoadReport {
        let mut warnings = Vec::new();
        let mut kept: Vec<CatalogEntry> = Vec::with_capacity(entries.len());
        let mut by_sku: HashMap<String, usize> = HashMap::with_capacity(entries.len());
        let mut entries_dropped = 0usize;

        for mut entry in entries {
            entry.sku = entry.sku.trim().to_string();
            if entry.sku.is_empty() {
                entries_dropped += 1;
                warnings.push(DataQualityWarning::new(
                    "sku",
                    format!("catalog row {:?} has no SKU, dropped", entry.id),
                ));
                continue;
            }
            let key = sku_key(&entry.sku);
            if by_sku.contains_key(&key) {
                entries_dropped += 1;
                warnings.push(DataQualityWarning::new(
                    "sku",
                    format!("duplicate SKU `{}`, keeping first occurrence", entry.sku),
                ));
                continue;
            }
            entry.normalized_name = canonical_name(&entry.display_name);
            by_sku.insert(key, kept.len());
            kept.push(entry);
        }

        let mut by_competitor_sku: HashMap<String, usize> =
            HashMap::with_capacity(cross_references.len());
        let mut cross_references_dropped = 0usize;
        for reference in &cross_references {
            let competitor = reference.competitor_sku.trim();
            if competitor.is_empty() {
                cross_references_dropped += 1;
                warnings.push(DataQualityWarning::new(
                    "competitor_sku",
                    "cross-reference row has no competitor SKU, dropped",
                ));
                continue;
            }
            if by_competitor_sku.contains_key(&sku_key(competitor)) {
                cross_references_dropped += 1;
                warnings.push(DataQualityWarning::new(
                    "competitor_sku",
                    format!("duplicate competitor SKU `{competitor}`, keeping first occurrence"),
                ));
                continue;
            }
            match by_sku.get(&sku_key(&reference.our_sku)) {
                Some(index) => {
                    by_competitor_sku.insert(sku_key(competitor), *index);
                }
                None => {
                    cross_references_dropped += 1;
                    warnings.push(DataQualityWarning::new(
                        "our_sku",
                        format!(
                            "cross-reference `{competitor}` maps to unknown SKU `{}`, dropped",
                            reference.our_sku
                        ),
                    ));
                }
            }
        }

        for warning in &warnings {
            warn!(field = %warning.field, detail = %warning.detail, "catalog load warning");
        }

        let report = LoadReport {
            entries_loaded: kept.len(),
            entries_dropped,
            cross_references_loaded: by_competitor_sku.len(),
            cross_references_dropped,
            warnings,
        };

        let tokens = kept.iter().map(|entry| name_tokens(&entry.display_name)).collect();
        let next = Arc::new(CatalogSnapshot { entries: kept, tokens, by_sku, by_competitor_sku });
        match self.snapshot.write() {
            Ok(mut guard) => *guard = Some(next),
            Err(poisoned) => *poisoned.into_inner() = Some(next),
        }

        info!(
            entries = report.entries_loaded,
            dropped = report.entries_dropped,
            cross_references = report.cross_references_loaded,
            "catalog index loaded"
        );
        report
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Current snapshot, or `CatalogUnavailable` before the first successful
    /// load. All matching fails until then.
    pub fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, DomainError> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone().ok_or(DomainError::CatalogUnavailable),
            Err(_) => Err(DomainError::CatalogUnavailable),
        }
    }

    pub fn lookup_by_sku(&self, sku: &str) -> Result<Option<CatalogEntry>, DomainError> {
        Ok(self.snapshot()?.lookup_by_sku(sku).cloned())
    }

    pub fn lookup_by_cross_reference(
        &self,
        competitor_sku: &str,
    ) -> Result<Option<CatalogEntry>, DomainError> {
        Ok(self.snapshot()?.lookup_by_cross_reference(competitor_sku).cloned())
    }

    pub fn search_by_name(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, DomainError> {
        Ok(self.snapshot()?.search_by_name(query, limit).into_iter().cloned().collect())
    }
}

fn sku_key(sku: &str) -> String {
    sku.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::{CatalogEntry, CrossReference, EntryId};
    use crate::errors::DomainError;
    use crate::normalize::name_tokens;

    use super::{dice_coefficient, CatalogIndex};

    fn entry(id: &str, sku: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            id: EntryId(id.to_string()),
            sku: sku.to_string(),
            display_name: name.to_string(),
            normalized_name: String::new(),
            expected_price: Decimal::new(4000, 2),
            cost: Some(Decimal::new(2800, 2)),
            stock_level: None,
        }
    }

    #[test]
    fn lookup_round_trips_every_loaded_sku() {
        let index = CatalogIndex::new();
        let entries =
            vec![entry("e1", "WIDGET-001", "Industrial Widget"), entry("e2", "BOLT-9", "Hex Bolt")];
        index.load(entries.clone(), Vec::new());

        for loaded in &entries {
            let found = index.lookup_by_sku(&loaded.sku).expect("loaded").expect("present");
            assert_eq!(found.sku, loaded.sku);
        }
        assert_eq!(index.lookup_by_sku("NEVER-LOADED").expect("loaded"), None);
    }

    #[test]
    fn sku_lookup_is_case_insensitive_and_trimmed() {
        let index = CatalogIndex::new();
        index.load(vec![entry("e1", "WIDGET-001", "Industrial Widget")], Vec::new());
        assert!(index.lookup_by_sku("  widget-001 ").expect("loaded").is_some());
    }

    #[test]
    fn unloaded_index_reports_catalog_unavailable() {
        let index = CatalogIndex::new();
        assert_eq!(index.lookup_by_sku("WIDGET-001"), Err(DomainError::CatalogUnavailable));
        assert!(!index.is_loaded());
    }

    #[test]
    fn rows_without_sku_are_dropped_and_counted() {
        let index = CatalogIndex::new();
        let report = index.load(
            vec![entry("e1", "WIDGET-001", "Industrial Widget"), entry("e2", "  ", "Ghost Row")],
            Vec::new(),
        );
        assert_eq!(report.entries_loaded, 1);
        assert_eq!(report.entries_dropped, 1);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn cross_reference_resolves_to_owning_entry() {
        let index = CatalogIndex::new();
        index.load(
            vec![entry("e1", "OUR-456", "Standard Fastener")],
            vec![CrossReference {
                competitor_sku: "COMP-123".to_string(),
                our_sku: "OUR-456".to_string(),
                competitor_name: None,
            }],
        );
        let resolved =
            index.lookup_by_cross_reference("comp-123").expect("loaded").expect("mapped");
        assert_eq!(resolved.sku, "OUR-456");
        assert_eq!(index.lookup_by_cross_reference("COMP-999").expect("loaded"), None);
    }

    #[test]
    fn cross_reference_to_unknown_sku_is_dropped() {
        let index = CatalogIndex::new();
        let report = index.load(
            vec![entry("e1", "OUR-456", "Standard Fastener")],
            vec![CrossReference {
                competitor_sku: "COMP-123".to_string(),
                our_sku: "MISSING-1".to_string(),
                competitor_name: None,
            }],
        );
        assert_eq!(report.cross_references_loaded, 0);
        assert_eq!(report.cross_references_dropped, 1);
    }

    #[test]
    fn duplicate_competitor_sku_keeps_first_mapping() {
        let index = CatalogIndex::new();
        let report = index.load(
            vec![
                entry("e1", "OUR-456", "Standard Fastener"),
                entry("e2", "OUR-789", "Deluxe Fastener"),
            ],
            vec![
                CrossReference {
                    competitor_sku: "COMP-123".to_string(),
                    our_sku: "OUR-456".to_string(),
                    competitor_name: None,
                },
                CrossReference {
                    competitor_sku: "comp-123".to_string(),
                    our_sku: "OUR-789".to_string(),
                    competitor_name: None,
                },
            ],
        );
        assert_eq!(report.cross_references_loaded, 1);
        assert_eq!(report.cross_references_dropped, 1);
        assert!(!report.warnings.is_empty());
        let resolved =
            index.lookup_by_cross_reference("COMP-123").expect("loaded").expect("mapped");
        assert_eq!(resolved.sku, "OUR-456");
    }

    #[test]
    fn reload_replaces_previous_contents() {
        let index = CatalogIndex::new();
        index.load(vec![entry("e1", "OLD-1", "Old Part")], Vec::new());
        index.load(vec![entry("e2", "NEW-1", "New Part")], Vec::new());
        assert_eq!(index.lookup_by_sku("OLD-1").expect("loaded"), None);
        assert!(index.lookup_by_sku("NEW-1").expect("loaded").is_some());
    }

    #[test]
    fn search_by_name_orders_by_overlap() {
        let index = CatalogIndex::new();
        index.load(
            vec![
                entry("e1", "WIDGET-001", "Industrial Widget Standard"),
                entry("e2", "WIDGET-002", "Industrial Widget Premium"),
                entry("e3", "CABLE-01", "Fiber Cable"),
            ],
            Vec::new(),
        );
        let results = index.search_by_name("industrial widget standard", 5).expect("loaded");
        assert_eq!(results[0].sku, "WIDGET-001");
        assert!(results.iter().all(|found| found.sku != "CABLE-01"));
    }

    #[test]
    fn dice_is_symmetric() {
        let a = name_tokens("industrial widget standard");
        let b = name_tokens("premium widget kit");
        assert_eq!(dice_coefficient(&a, &b), dice_coefficient(&b, &a));
    }

    #[test]
    fn dice_of_identical_sets_is_one() {
        let a = name_tokens("industrial widget");
        assert_eq!(dice_coefficient(&a, &a), 1.0);
    }
}
