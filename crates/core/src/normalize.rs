//! Candidate normalization: raw extracted line items into a canonical
//! comparison form.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

use crate::domain::candidate::{Candidate, RawCandidate, RawField};
use crate::errors::DataQualityWarning;

/// Result of normalizing one raw candidate. Warnings describe defaulted or
/// discarded fields; they never block the candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizeOutcome {
    pub candidate: Candidate,
    pub warnings: Vec<DataQualityWarning>,
}

/// Lowercased alphanumeric tokens of length >= 2, sorted and deduplicated.
/// The stable ordering makes downstream similarity scoring reproducible.
pub fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens: Vec<String> = name
        .to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Canonical space-joined form of a display name, as stored on catalog entries.
pub fn canonical_name(name: &str) -> String {
    name_tokens(name).join(" ")
}

pub fn normalize(raw: &RawCandidate) -> NormalizeOutcome {
    let mut warnings = Vec::new();

    let raw_name = raw.raw_name.trim().to_string();
    if raw_name.is_empty() {
        warnings.push(DataQualityWarning::new("raw_name", "candidate name is empty"));
    }
    let normalized_tokens = name_tokens(&raw_name);

    let raw_sku = raw
        .raw_sku
        .as_deref()
        .map(str::trim)
        .filter(|sku| !sku.is_empty())
        .map(str::to_string);

    let quantity = coerce_quantity(raw.quantity.as_ref(), &mut warnings);
    let unit_price = coerce_price(raw.raw_unit_price.as_ref(), &mut warnings);

    for warning in &warnings {
        warn!(field = %warning.field, detail = %warning.detail, "candidate data-quality warning");
    }

    NormalizeOutcome {
        candidate: Candidate {
            raw_name,
            normalized_tokens,
            raw_sku,
            quantity,
            unit_price,
            source_confidence: raw.source_confidence,
        },
        warnings,
    }
}

/// Quantity must be a positive integer; anything else defaults to 1 with a
/// warning rather than failing the candidate.
fn coerce_quantity(raw: Option<&RawField>, warnings: &mut Vec<DataQualityWarning>) -> u32 {
    let numeric = match raw {
        None => {
            warnings.push(DataQualityWarning::new("quantity", "missing quantity, defaulting to 1"));
            return 1;
        }
        Some(RawField::Number(value)) => Some(*value),
        Some(RawField::Text(text)) => text.trim().parse::<f64>().ok(),
    };

    match numeric {
        Some(value) if value.is_finite() && value >= 1.0 && value <= u32::MAX as f64 => {
            if value.fract() != 0.0 {
                warnings.push(DataQualityWarning::new(
                    "quantity",
                    format!("fractional quantity {value} truncated"),
                ));
            }
            value.trunc() as u32
        }
        Some(value) => {
            warnings.push(DataQualityWarning::new(
                "quantity",
                format!("non-positive quantity {value}, defaulting to 1"),
            ));
            1
        }
        None => {
            warnings.push(DataQualityWarning::new(
                "quantity",
                "non-numeric quantity, defaulting to 1",
            ));
            1
        }
    }
}

/// Unit price coerces to a non-negative decimal, or stays None when absent or
/// unparsable. None defers pricing to the insight engine.
fn coerce_price(raw: Option<&RawField>, warnings: &mut Vec<DataQualityWarning>) -> Option<Decimal> {
    let parsed = match raw {
        None => return None,
        Some(RawField::Number(value)) => Decimal::from_str(&format!("{value}")).ok(),
        Some(RawField::Text(text)) => {
            let cleaned: String = text
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|ch| *ch != ',')
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
    };

    match parsed {
        Some(price) if price >= Decimal::ZERO => Some(price),
        Some(price) => {
            warnings.push(DataQualityWarning::new(
                "raw_unit_price",
                format!("negative unit price {price} discarded"),
            ));
            None
        }
        None => {
            warnings.push(DataQualityWarning::new(
                "raw_unit_price",
                "unparsable unit price discarded",
            ));
            None
        }
    }
}
