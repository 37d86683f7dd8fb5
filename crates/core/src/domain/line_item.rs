use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::EntryId;
use crate::matching::MatchType;

/// How a line item was matched, kept for audit once the quote is persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub entry_id: EntryId,
    pub score: f64,
    pub match_type: MatchType,
}

/// Final output unit handed to quote persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconciledLineItem {
    pub sku: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// None when the line was manually entered rather than matched.
    pub match_metadata: Option<MatchMetadata>,
    pub reviewer_overridden: bool,
}

impl ReconciledLineItem {
    pub fn new(
        sku: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        match_metadata: Option<MatchMetadata>,
        reviewer_overridden: bool,
    ) -> Self {
        let mut line = Self {
            sku: sku.into(),
            description: description.into(),
            quantity,
            unit_price,
            total_price: Decimal::ZERO,
            match_metadata,
            reviewer_overridden,
        };
        line.recompute_total();
        line
    }

    /// Total is always quantity x unit price; callers must invoke this after
    /// every quantity or price mutation.
    pub fn recompute_total(&mut self) {
        self.total_price = self.unit_price * Decimal::from(self.quantity);
    }
}
