use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

/// One sellable product, immutable per catalog load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub sku: String,
    pub display_name: String,
    /// Canonical space-joined token form of `display_name`. Recomputed on
    /// every load; input files may omit it.
    #[serde(default)]
    pub normalized_name: String,
    pub expected_price: Decimal,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub stock_level: Option<u32>,
}

/// Mapping from a competitor part number to one of our SKUs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub competitor_sku: String,
    pub our_sku: String,
    #[serde(default)]
    pub competitor_name: Option<String>,
}
