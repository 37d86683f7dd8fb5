//! Pricing Insight Engine: suggested price, margin, alerts, and upsell
//! opportunities for a matched (or unmatched) candidate.
//!
//! Everything here is a pure function of its inputs. Insights are derived
//! state, recomputed on every match or price change, never persisted alone.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;
use crate::domain::candidate::Candidate;
use crate::matching::MatchResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    NotInCatalog,
    LowStock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Needs reviewer action before the line can be auto-applied.
    Blocking,
    /// Shown to the reviewer, never prevents matching or quoting.
    Informational,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub detail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// Price raise that restores the configured margin floor.
    RestoreMargin,
    /// Customer previously paid more than the current base price.
    HistoricalPrice,
}

/// Advisory upsell. Never emitted as an alert; the reviewer decides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub kind: OpportunityKind,
    pub suggested_price: Decimal,
    pub rationale: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingInsight {
    pub suggested_price: Decimal,
    pub margin_percent: Decimal,
    pub alerts: Vec<Alert>,
    pub opportunities: Vec<Opportunity>,
}

/// Read-only seam to the external customer history service. Absence of the
/// collaborator simply disables the history-based opportunity.
pub trait CustomerHistory: Send + Sync {
    fn historical_price(&self, customer_id: &str, sku: &str) -> Option<Decimal>;
}

/// Default no-op history source.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHistory;

impl CustomerHistory for NoHistory {
    fn historical_price(&self, _customer_id: &str, _sku: &str) -> Option<Decimal> {
        None
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InsightEngine {
    margin_floor: Decimal,
    low_stock_threshold: u32,
    cost_fallback_ratio: Decimal,
}

impl InsightEngine {
    pub fn new() -> Self {
        Self::from_config(&PricingConfig {
            margin_floor: 0.20,
            low_stock_threshold: 20,
            cost_fallback_ratio: 0.6,
        })
    }

    pub fn from_config(pricing: &PricingConfig) -> Self {
        Self {
            margin_floor: Decimal::from_f64(pricing.margin_floor)
                .unwrap_or_else(|| Decimal::new(20, 2)),
            low_stock_threshold: pricing.low_stock_threshold,
            cost_fallback_ratio: Decimal::from_f64(pricing.cost_fallback_ratio)
                .unwrap_or_else(|| Decimal::new(6, 1)),
        }
    }

    pub fn compute_insight(
        &self,
        match_result: &MatchResult,
        candidate: &Candidate,
        history: &dyn CustomerHistory,
        customer_id: Option<&str>,
    ) -> PricingInsight {
        let Some(best) = match_result.best() else {
            return PricingInsight {
                suggested_price: candidate.unit_price.unwrap_or(Decimal::ZERO),
                margin_percent: Decimal::ZERO,
                alerts: vec![Alert {
                    kind: AlertKind::NotInCatalog,
                    severity: AlertSeverity::Blocking,
                    detail: format!("`{}` has no catalog match; needs manual entry", candidate.raw_name),
                }],
                opportunities: Vec::new(),
            };
        };

        let entry = &best.entry;
        let base_price = entry.expected_price;
        // Estimated cost when none is on file; an estimate, not a real figure.
        let cost = entry.cost.unwrap_or(base_price * self.cost_fallback_ratio);

        let margin_percent = if base_price > Decimal::ZERO {
            ((base_price - cost) / base_price * Decimal::ONE_HUNDRED).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let mut alerts = Vec::new();
        let mut opportunities = Vec::new();

        let floor_percent = self.margin_floor * Decimal::ONE_HUNDRED;
        if margin_percent < floor_percent && cost > Decimal::ZERO {
            let restored = (cost / (Decimal::ONE - self.margin_floor)).round_dp(2);
            opportunities.push(Opportunity {
                kind: OpportunityKind::RestoreMargin,
                suggested_price: restored,
                rationale: format!(
                    "Margin {margin_percent}% is below the {floor_percent}% floor; {restored} restores it"
                ),
            });
        }

        if let Some(customer_id) = customer_id {
            if let Some(prior) = history.historical_price(customer_id, &entry.sku) {
                if prior > base_price {
                    opportunities.push(Opportunity {
                        kind: OpportunityKind::HistoricalPrice,
                        suggested_price: prior,
                        rationale: format!("Customer previously paid {prior} for `{}`", entry.sku),
                    });
                }
            }
        }

        if let Some(stock) = entry.stock_level {
            if stock < self.low_stock_threshold {
                alerts.push(Alert {
                    kind: AlertKind::LowStock,
                    severity: AlertSeverity::Informational,
                    detail: format!("`{}` has {stock} units in stock", entry.sku),
                });
            }
        }

        // The highest-value opportunity wins by default; the reviewer may
        // still pick any opportunity or type a custom price.
        let suggested_price = opportunities
            .iter()
            .map(|opportunity| opportunity.suggested_price)
            .fold(None::<Decimal>, |best, price| match best {
                Some(current) if current >= price => Some(current),
                _ => Some(price),
            })
            .unwrap_or(base_price);

        PricingInsight { suggested_price, margin_percent, alerts, opportunities }
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}
