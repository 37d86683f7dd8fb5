use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Uuid);

impl CandidateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

/// Loosely typed field as produced by upstream extraction. Extractors emit
/// numbers or free text depending on document quality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

/// One extracted line item, exactly as the upstream producer handed it over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub raw_name: String,
    #[serde(default)]
    pub raw_sku: Option<String>,
    #[serde(default)]
    pub quantity: Option<RawField>,
    #[serde(default)]
    pub raw_unit_price: Option<RawField>,
    /// Extraction confidence reported upstream, independent of match confidence.
    #[serde(default)]
    pub source_confidence: Option<f64>,
}

/// Canonical comparison form of a raw candidate. Normalization is
/// deterministic: the same raw input always yields the same candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub raw_name: String,
    /// Lowercased alphanumeric tokens (length >= 2), sorted and deduplicated.
    pub normalized_tokens: Vec<String>,
    pub raw_sku: Option<String>,
    pub quantity: u32,
    /// None means "to be priced by the insight engine", not zero.
    pub unit_price: Option<Decimal>,
    pub source_confidence: Option<f64>,
}
