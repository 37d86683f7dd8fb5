//! End-to-end reconciliation scenarios: catalog load through finalized
//! line items.

use rust_decimal::Decimal;

use rfqmatch_core::{
    AlertKind, CatalogEntry, CatalogIndex, CrossReference, EngineConfig, EntryId, MatchType,
    RawCandidate, RawField, ReconciliationSession, SessionState,
};

fn entry(
    id: &str,
    sku: &str,
    name: &str,
    price_cents: i64,
    cost_cents: Option<i64>,
) -> CatalogEntry {
    CatalogEntry {
        id: EntryId(id.to_string()),
        sku: sku.to_string(),
        display_name: name.to_string(),
        normalized_name: String::new(),
        expected_price: Decimal::new(price_cents, 2),
        cost: cost_cents.map(|cents| Decimal::new(cents, 2)),
        stock_level: None,
    }
}

fn raw(name: &str, sku: Option<&str>, quantity: f64) -> RawCandidate {
    RawCandidate {
        raw_name: name.to_string(),
        raw_sku: sku.map(str::to_string),
        quantity: Some(RawField::Number(quantity)),
        raw_unit_price: None,
        source_confidence: None,
    }
}

#[test]
fn exact_sku_widget_quote_end_to_end() {
    let index = CatalogIndex::new();
    index.load(
        vec![entry("e1", "WIDGET-001", "Industrial Widget Standard", 4000, Some(2800))],
        Vec::new(),
    );

    let mut session = ReconciliationSession::new(
        vec![raw("Industrial Widget Standard", Some("WIDGET-001"), 25.0)],
        &EngineConfig::default(),
    );
    session.run_matching(&index).expect("matching");

    let record = &session.records()[0];
    let best = record.match_result.as_ref().expect("matched").best().expect("best");
    assert_eq!(best.score, 1.0);
    assert_eq!(best.match_type, MatchType::ExactSku);

    // 40.00 price over 28.00 cost: 30% margin, clear of the 20% floor.
    let insight = record.insight.as_ref().expect("insight");
    assert_eq!(insight.margin_percent, Decimal::new(30, 0));
    assert!(insight.opportunities.is_empty());

    let candidate_id = record.id;
    session.accept_match(candidate_id, 0, None).expect("accept");
    let outcome = session.finalize(None).expect("finalize");
    assert_eq!(outcome.line_items.len(), 1);
    assert_eq!(outcome.line_items[0].total_price, Decimal::new(100_000, 2));
}

#[test]
fn cross_reference_resolves_competitor_part() {
    let index = CatalogIndex::new();
    index.load(
        vec![entry("e1", "OUR-456", "Standard Fastener Kit", 2500, Some(1500))],
        vec![CrossReference {
            competitor_sku: "COMP-123".to_string(),
            our_sku: "OUR-456".to_string(),
            competitor_name: Some("CompetitorCo".to_string()),
        }],
    );

    let mut session = ReconciliationSession::new(
        vec![raw("competitor fastener", Some("COMP-123"), 10.0)],
        &EngineConfig::default(),
    );
    session.run_matching(&index).expect("matching");

    let best =
        session.records()[0].match_result.as_ref().expect("matched").best().expect("best");
    assert_eq!(best.score, 0.95);
    assert_eq!(best.match_type, MatchType::CrossReference);
    assert_eq!(best.entry.sku, "OUR-456");
}

#[test]
fn unmatched_candidate_needs_manual_entry() {
    let index = CatalogIndex::new();
    index.load(
        vec![entry("e1", "WIDGET-001", "Industrial Widget Standard", 4000, Some(2800))],
        Vec::new(),
    );

    let mut session = ReconciliationSession::new(
        vec![RawCandidate {
            raw_name: "quantum flux capacitor".to_string(),
            raw_sku: None,
            quantity: Some(RawField::Number(1.0)),
            raw_unit_price: Some(RawField::Number(19.99)),
            source_confidence: None,
        }],
        &EngineConfig::default(),
    );
    session.run_matching(&index).expect("matching");

    let record = &session.records()[0];
    assert!(record.match_result.as_ref().expect("matched").is_empty());
    let insight = record.insight.as_ref().expect("insight");
    assert_eq!(insight.alerts[0].kind, AlertKind::NotInCatalog);
    assert_eq!(insight.suggested_price, Decimal::new(1999, 2));
}

#[test]
fn bulk_apply_splits_batch_at_threshold() {
    let index = CatalogIndex::new();
    let mut entries: Vec<CatalogEntry> = (0..6)
        .map(|n| {
            entry(
                &format!("hit{n}"),
                &format!("HIT-{n:03}"),
                &format!("Alpha Beta Gamma Part {n}"),
                1000,
                Some(600),
            )
        })
        .collect();
    entries.push(entry("other", "OTHER-1", "Unrelated Thing", 1000, Some(600)));
    index.load(entries, Vec::new());

    // Six candidates carry exact SKUs (score 1.0); four share no vocabulary
    // with the catalog and stay unmatched.
    let mut candidates: Vec<RawCandidate> = (0..6)
        .map(|n| raw(&format!("Alpha Beta Gamma Part {n}"), Some(&format!("HIT-{n:03}")), 1.0))
        .collect();
    for n in 0..4 {
        candidates.push(raw(&format!("mystery item number {n}{n}{n}"), None, 1.0));
    }

    let mut session = ReconciliationSession::new(candidates, &EngineConfig::default());
    session.run_matching(&index).expect("matching");

    let applied = session.bulk_apply(Some(0.6), None).expect("bulk apply");
    assert_eq!(applied, 6);
    assert_eq!(session.pending_candidates().len(), 4);
    assert_eq!(session.line_items().len(), 6);
    assert_eq!(session.state(), SessionState::AwaitingReview);
}

#[test]
fn rematch_after_catalog_reload_fills_gaps() {
    let index = CatalogIndex::new();
    index.load(
        vec![entry("e1", "WIDGET-001", "Industrial Widget Standard", 4000, Some(2800))],
        Vec::new(),
    );

    let mut session = ReconciliationSession::new(
        vec![
            raw("Industrial Widget Standard", Some("WIDGET-001"), 1.0),
            raw("fiber optic cable", Some("CABLE-01"), 1.0),
        ],
        &EngineConfig::default(),
    );
    session.run_matching(&index).expect("matching");
    let widget_id = session.records()[0].id;
    session.accept_match(widget_id, 0, None).expect("accept widget");
    assert!(session.records()[1].match_result.as_ref().expect("matched").is_empty());

    // The cable lands in the catalog later; pending candidates pick it up.
    index.load(
        vec![
            entry("e1", "WIDGET-001", "Industrial Widget Standard", 4000, Some(2800)),
            entry("e2", "CABLE-01", "Fiber Optic Cable", 1500, Some(900)),
        ],
        Vec::new(),
    );
    let rematched = session.rematch_pending(&index, None).expect("rematch");
    assert_eq!(rematched, 1);
    let best =
        session.records()[1].match_result.as_ref().expect("matched").best().expect("best");
    assert_eq!(best.match_type, MatchType::ExactSku);
    // The accepted widget line survived the re-match untouched.
    assert!(session.records()[0].line.is_some());
}
