//! Reconciliation Session: one batch of extracted candidates taken through
//! normalize -> score -> price-insight, held for review, and finalized into
//! quote line items.
//!
//! The session exclusively owns its working set. Reviewer actions are
//! serialized per session; callers may pass an expected version for
//! optimistic concurrency. Nothing is persisted until `finalize`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::catalog::CatalogIndex;
use crate::config::EngineConfig;
use crate::domain::candidate::{Candidate, CandidateId, RawCandidate};
use crate::domain::line_item::{MatchMetadata, ReconciledLineItem};
use crate::errors::{DataQualityWarning, DomainError};
use crate::insight::{CustomerHistory, InsightEngine, NoHistory, PricingInsight};
use crate::matching::{MatchResult, MatchScorer, MatchType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Initialized,
    Matching,
    AwaitingReview,
    Finalized,
}

/// Per-candidate working record, keyed by a stable id rather than batch
/// position so insertion and removal cannot cross wires.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub candidate: Candidate,
    pub warnings: Vec<DataQualityWarning>,
    pub match_result: Option<MatchResult>,
    pub insight: Option<PricingInsight>,
    /// Present once the reviewer accepted or entered a line for this candidate.
    pub line: Option<ReconciledLineItem>,
}

/// Audit trail entry; one per applied reviewer action.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionEvent {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub action: String,
}

/// Field-level edit from the reviewer. Unset fields keep their value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LinePatch {
    pub sku: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<Decimal>,
}

/// Handoff payload for external quote persistence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub customer_id: Option<String>,
    pub line_items: Vec<ReconciledLineItem>,
    pub finalized_at: DateTime<Utc>,
}

pub struct ReconciliationSession {
    id: SessionId,
    state: SessionState,
    version: u64,
    customer_id: Option<String>,
    scorer: MatchScorer,
    insight_engine: InsightEngine,
    bulk_apply_threshold: f64,
    history: Arc<dyn CustomerHistory>,
    records: Vec<CandidateRecord>,
    manual_lines: Vec<ReconciledLineItem>,
    events: Vec<SessionEvent>,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

impl ReconciliationSession {
    /// Normalizes the raw batch and holds it in `Initialized`.
    pub fn new(raw_candidates: Vec<RawCandidate>, config: &EngineConfig) -> Self {
        let records = raw_candidates
            .iter()
            .map(|raw| {
                let outcome = crate::normalize::normalize(raw);
                CandidateRecord {
                    id: CandidateId::new(),
                    candidate: outcome.candidate,
                    warnings: outcome.warnings,
                    match_result: None,
                    insight: None,
                    line: None,
                }
            })
            .collect();

        Self {
            id: SessionId(Uuid::new_v4()),
            state: SessionState::Initialized,
            version: 0,
            customer_id: None,
            scorer: MatchScorer::from_config(&config.matching),
            insight_engine: InsightEngine::from_config(&config.pricing),
            bulk_apply_threshold: config.review.bulk_apply_threshold,
            history: Arc::new(NoHistory),
            records,
            manual_lines: Vec::new(),
            events: Vec::new(),
            created_at: Utc::now(),
            finalized_at: None,
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_history(mut self, history: Arc<dyn CustomerHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn manual_lines(&self) -> &[ReconciledLineItem] {
        &self.manual_lines
    }

    /// Candidates still without an accepted line.
    pub fn pending_candidates(&self) -> Vec<CandidateId> {
        self.records
            .iter()
            .filter(|record| record.line.is_none())
            .map(|record| record.id)
            .collect()
    }

    /// Current line-item set: accepted candidate lines plus manual entries.
    pub fn line_items(&self) -> Vec<&ReconciledLineItem> {
        self.records
            .iter()
            .filter_map(|record| record.line.as_ref())
            .chain(self.manual_lines.iter())
            .collect()
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self.state, next),
            (SessionState::Initialized, SessionState::Matching)
                | (SessionState::Matching, SessionState::AwaitingReview)
                | (SessionState::AwaitingReview, SessionState::Finalized)
        )
    }

    fn transition_to(&mut self, next: SessionState) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.state = next;
            return Ok(());
        }
        Err(DomainError::InvalidSessionTransition { from: self.state, to: next })
    }

    /// Scores and prices every candidate, then moves to `AwaitingReview`.
    /// Candidates are independent; one candidate failing to match degrades
    /// to an empty result rather than aborting the batch.
    pub fn run_matching(&mut self, catalog: &CatalogIndex) -> Result<(), DomainError> {
        if !self.can_transition_to(SessionState::Matching) {
            return Err(DomainError::InvalidSessionTransition {
                from: self.state,
                to: SessionState::Matching,
            });
        }
        // Snapshot before transitioning: an unloaded catalog fails the whole
        // batch and leaves the session re-runnable.
        let snapshot = catalog.snapshot()?;
        self.transition_to(SessionState::Matching)?;

        let customer_id = self.customer_id.clone();
        for record in &mut self.records {
            let match_result = self.scorer.score(&record.candidate, &snapshot);
            let insight = self.insight_engine.compute_insight(
                &match_result,
                &record.candidate,
                self.history.as_ref(),
                customer_id.as_deref(),
            );
            record.match_result = Some(match_result);
            record.insight = Some(insight);
        }

        self.transition_to(SessionState::AwaitingReview)?;
        self.record_action("matching_completed");
        info!(
            session_id = %self.id.0,
            candidates = self.records.len(),
            "reconciliation matching completed"
        );
        Ok(())
    }

    /// Re-scores pending candidates against the current catalog, e.g. after
    /// a reload. Accepted lines are never rescored. Returns the number of
    /// candidates re-matched.
    pub fn rematch_pending(
        &mut self,
        catalog: &CatalogIndex,
        expected_version: Option<u64>,
    ) -> Result<usize, DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        let snapshot = catalog.snapshot()?;

        let customer_id = self.customer_id.clone();
        let mut rematched = 0usize;
        for record in &mut self.records {
            if record.line.is_some() {
                continue;
            }
            let match_result = self.scorer.score(&record.candidate, &snapshot);
            let insight = self.insight_engine.compute_insight(
                &match_result,
                &record.candidate,
                self.history.as_ref(),
                customer_id.as_deref(),
            );
            record.match_result = Some(match_result);
            record.insight = Some(insight);
            rematched += 1;
        }

        self.record_action(format!("rematch_pending count={rematched}"));
        Ok(rematched)
    }

    /// Accepts the match at `rank` (0 = strongest) as this candidate's line
    /// item, priced at the recomputed insight's suggested price. Idempotent:
    /// re-accepting the same rank rebuilds the identical line.
    pub fn accept_match(
        &mut self,
        candidate_id: CandidateId,
        rank: usize,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        let engine = self.insight_engine;
        let history = Arc::clone(&self.history);
        let customer_id = self.customer_id.clone();
        let record = self.record_mut(candidate_id)?;
        accept_into_record(record, rank, engine, history.as_ref(), customer_id.as_deref())?;
        self.record_action(format!("accept_match candidate={} rank={rank}", candidate_id.0));
        Ok(())
    }

    /// Reprices the candidate's line at one of its insight opportunities.
    /// Accepts the strongest match first when no line exists yet.
    pub fn apply_opportunity(
        &mut self,
        candidate_id: CandidateId,
        opportunity_index: usize,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        let engine = self.insight_engine;
        let history = Arc::clone(&self.history);
        let customer_id = self.customer_id.clone();
        let record = self.record_mut(candidate_id)?;
        if record.line.is_none() {
            accept_into_record(record, 0, engine, history.as_ref(), customer_id.as_deref())?;
        }
        let price = record
            .insight
            .as_ref()
            .and_then(|insight| insight.opportunities.get(opportunity_index))
            .map(|opportunity| opportunity.suggested_price)
            .ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "candidate has no opportunity at index {opportunity_index}"
                ))
            })?;
        if let Some(line) = record.line.as_mut() {
            line.unit_price = price;
            line.recompute_total();
        }
        self.record_action(format!(
            "apply_opportunity candidate={} index={opportunity_index}",
            candidate_id.0
        ));
        Ok(())
    }

    /// Applies reviewer edits to the candidate's line, creating one from the
    /// candidate's own fields if nothing was accepted yet. Marks the line
    /// `reviewer_overridden`.
    pub fn override_line(
        &mut self,
        candidate_id: CandidateId,
        patch: LinePatch,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        if patch.quantity == Some(0) {
            return Err(DomainError::InvariantViolation(
                "line quantity must be a positive integer".to_string(),
            ));
        }
        let record = self.record_mut(candidate_id)?;

        let mut line = record.line.take().unwrap_or_else(|| {
            let candidate = &record.candidate;
            let price = record
                .insight
                .as_ref()
                .map(|insight| insight.suggested_price)
                .or(candidate.unit_price)
                .unwrap_or(Decimal::ZERO);
            ReconciledLineItem::new(
                candidate.raw_sku.clone().unwrap_or_default(),
                candidate.raw_name.clone(),
                candidate.quantity,
                price,
                None,
                true,
            )
        });

        if let Some(sku) = patch.sku {
            line.sku = sku;
        }
        if let Some(description) = patch.description {
            line.description = description;
        }
        if let Some(quantity) = patch.quantity {
            line.quantity = quantity;
        }
        if let Some(unit_price) = patch.unit_price {
            line.unit_price = unit_price;
        }
        line.reviewer_overridden = true;
        line.recompute_total();
        record.line = Some(line);
        self.record_action(format!("override_line candidate={}", candidate_id.0));
        Ok(())
    }

    /// Adds a line item with no backing candidate at all.
    pub fn add_manual_line(
        &mut self,
        sku: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        if quantity == 0 {
            return Err(DomainError::InvariantViolation(
                "line quantity must be a positive integer".to_string(),
            ));
        }
        let line = ReconciledLineItem::new(sku, description, quantity, unit_price, None, true);
        self.manual_lines.push(line);
        self.record_action("add_manual_line");
        Ok(())
    }

    /// Returns the candidate to pending review. Clearing an already-pending
    /// candidate is a no-op.
    pub fn clear_line(
        &mut self,
        candidate_id: CandidateId,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        let record = self.record_mut(candidate_id)?;
        record.line = None;
        self.record_action(format!("clear_line candidate={}", candidate_id.0));
        Ok(())
    }

    /// Accepts the strongest match for every pending candidate whose best
    /// score clears the threshold (session default when None). Candidates
    /// with an accepted line are untouched, so reapplying is idempotent.
    /// Returns the number of lines applied by this call.
    pub fn bulk_apply(
        &mut self,
        threshold: Option<f64>,
        expected_version: Option<u64>,
    ) -> Result<usize, DomainError> {
        self.ensure_reviewable()?;
        self.check_version(expected_version)?;
        let threshold = threshold.unwrap_or(self.bulk_apply_threshold);
        let engine = self.insight_engine;
        let history = Arc::clone(&self.history);
        let customer_id = self.customer_id.clone();

        let mut applied = 0usize;
        for record in &mut self.records {
            if record.line.is_some() {
                continue;
            }
            let qualifies = record
                .match_result
                .as_ref()
                .and_then(|result| result.best())
                .map(|best| best.match_type != MatchType::None && best.score >= threshold)
                .unwrap_or(false);
            if !qualifies {
                continue;
            }
            accept_into_record(record, 0, engine, history.as_ref(), customer_id.as_deref())?;
            applied += 1;
        }

        self.record_action(format!("bulk_apply threshold={threshold} applied={applied}"));
        Ok(applied)
    }

    /// Freezes the line-item set and hands it off. Every mutation afterwards
    /// fails with `InvalidSessionTransition`.
    pub fn finalize(&mut self, expected_version: Option<u64>) -> Result<SessionOutcome, DomainError> {
        if !self.can_transition_to(SessionState::Finalized) {
            return Err(DomainError::InvalidSessionTransition {
                from: self.state,
                to: SessionState::Finalized,
            });
        }
        self.check_version(expected_version)?;
        self.transition_to(SessionState::Finalized)?;
        let finalized_at = Utc::now();
        self.finalized_at = Some(finalized_at);
        self.record_action("finalized");
        info!(
            session_id = %self.id.0,
            line_items = self.line_items().len(),
            "reconciliation session finalized"
        );

        Ok(SessionOutcome {
            session_id: self.id,
            customer_id: self.customer_id.clone(),
            line_items: self.line_items().into_iter().cloned().collect(),
            finalized_at,
        })
    }

    fn ensure_reviewable(&self) -> Result<(), DomainError> {
        if self.state == SessionState::AwaitingReview {
            return Ok(());
        }
        Err(DomainError::InvalidSessionTransition {
            from: self.state,
            to: SessionState::AwaitingReview,
        })
    }

    fn check_version(&self, expected: Option<u64>) -> Result<(), DomainError> {
        match expected {
            Some(expected) if expected != self.version => {
                Err(DomainError::VersionConflict { expected, actual: self.version })
            }
            _ => Ok(()),
        }
    }

    fn record_mut(&mut self, candidate_id: CandidateId) -> Result<&mut CandidateRecord, DomainError> {
        self.records
            .iter_mut()
            .find(|record| record.id == candidate_id)
            .ok_or(DomainError::UnknownCandidate(candidate_id))
    }

    fn record_action(&mut self, action: impl Into<String>) {
        self.version += 1;
        self.events.push(SessionEvent { seq: self.version, at: Utc::now(), action: action.into() });
    }
}

/// Builds the candidate's line from the match at `rank`, repricing through a
/// fresh insight over just that match.
fn accept_into_record(
    record: &mut CandidateRecord,
    rank: usize,
    engine: InsightEngine,
    history: &dyn CustomerHistory,
    customer_id: Option<&str>,
) -> Result<(), DomainError> {
    let result = record.match_result.as_ref().ok_or_else(|| {
        DomainError::InvariantViolation("candidate has not been matched yet".to_string())
    })?;
    let chosen = result
        .matches
        .get(rank)
        .cloned()
        .ok_or_else(|| DomainError::InvariantViolation(format!("no match at rank {rank}")))?;

    let chosen_result = MatchResult { matches: vec![chosen.clone()] };
    let insight = engine.compute_insight(&chosen_result, &record.candidate, history, customer_id);
    let line = ReconciledLineItem::new(
        chosen.entry.sku.clone(),
        chosen.entry.display_name.clone(),
        record.candidate.quantity,
        insight.suggested_price,
        Some(MatchMetadata {
            entry_id: chosen.entry.id.clone(),
            score: chosen.score,
            match_type: chosen.match_type,
        }),
        false,
    );
    record.insight = Some(insight);
    record.line = Some(line);
    Ok(())
}
