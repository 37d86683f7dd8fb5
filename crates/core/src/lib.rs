pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod insight;
pub mod matching;
pub mod normalize;
pub mod session;

pub use catalog::{CatalogIndex, CatalogSnapshot, LoadReport};
pub use config::{ConfigError, EngineConfig, LoadOptions, LogFormat, LoggingConfig};
pub use domain::candidate::{Candidate, CandidateId, RawCandidate, RawField};
pub use domain::catalog::{CatalogEntry, CrossReference, EntryId};
pub use domain::line_item::{MatchMetadata, ReconciledLineItem};
pub use errors::{DataQualityWarning, DomainError};
pub use insight::{
    Alert, AlertKind, AlertSeverity, CustomerHistory, InsightEngine, NoHistory, Opportunity,
    OpportunityKind, PricingInsight,
};
pub use matching::{MatchResult, MatchScorer, MatchType, ScoredMatch};
pub use session::{
    CandidateRecord, LinePatch, ReconciliationSession, SessionEvent, SessionId, SessionOutcome,
    SessionState,
};
