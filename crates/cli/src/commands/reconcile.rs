use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use rfqmatch_core::{
    CatalogEntry, CatalogIndex, CrossReference, EngineConfig, LoadOptions, LoadReport,
    RawCandidate, ReconciliationSession, SessionOutcome, SessionState,
};

use super::CommandResult;

#[derive(Debug, Clone)]
pub struct ReconcileArgs {
    pub catalog: PathBuf,
    pub cross_references: Option<PathBuf>,
    pub candidates: PathBuf,
    pub customer: Option<String>,
    pub auto_apply: Option<f64>,
    pub finalize: bool,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ReconcileData {
    session_id: String,
    state: SessionState,
    load_report: LoadReport,
    candidates_total: usize,
    candidates_pending: usize,
    auto_applied: Option<usize>,
    records: serde_json::Value,
    line_items: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<SessionOutcome>,
}

pub fn run(args: ReconcileArgs) -> CommandResult {
    let config = match EngineConfig::load(LoadOptions {
        config_path: args.config_path.clone(),
        require_file: args.config_path.is_some(),
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("reconcile", "config_validation", error.to_string(), 2)
        }
    };

    match execute(&args, &config) {
        Ok(data) => {
            let message = match &data.outcome {
                Some(outcome) => {
                    format!("finalized {} line item(s)", outcome.line_items.len())
                }
                None => format!(
                    "matched {} candidate(s), {} pending review",
                    data.candidates_total, data.candidates_pending
                ),
            };
            CommandResult::success_with_data("reconcile", message, data)
        }
        Err(error) => CommandResult::failure("reconcile", "reconcile_failed", format!("{error:#}"), 1),
    }
}

fn execute(args: &ReconcileArgs, config: &EngineConfig) -> anyhow::Result<ReconcileData> {
    let entries: Vec<CatalogEntry> = load_json(&args.catalog)?;
    let cross_references: Vec<CrossReference> = match &args.cross_references {
        Some(path) => load_json(path)?,
        None => Vec::new(),
    };
    let raw_candidates: Vec<RawCandidate> = load_json(&args.candidates)?;

    let index = CatalogIndex::new();
    let load_report = index.load(entries, cross_references);

    let mut session = ReconciliationSession::new(raw_candidates, config);
    if let Some(customer) = &args.customer {
        session = session.with_customer(customer.clone());
    }
    session.run_matching(&index).context("matching failed")?;
    tracing::info!(
        session_id = %session.id().0,
        candidates = session.records().len(),
        "reconcile batch matched"
    );

    let auto_applied = match args.auto_apply {
        Some(threshold) => Some(session.bulk_apply(Some(threshold), None).context("bulk apply failed")?),
        None => None,
    };

    let records = serde_json::to_value(session.records())?;
    let line_items = serde_json::to_value(session.line_items())?;
    let candidates_total = session.records().len();
    let candidates_pending = session.pending_candidates().len();

    let outcome = if args.finalize {
        Some(session.finalize(None).context("finalize failed")?)
    } else {
        None
    };

    Ok(ReconcileData {
        session_id: session.id().0.to_string(),
        state: session.state(),
        load_report,
        candidates_total,
        candidates_pending,
        auto_applied,
        records,
        line_items,
        outcome,
    })
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("could not parse `{}`", path.display()))
}
