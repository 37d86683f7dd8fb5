use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::candidate::CandidateId;
use crate::session::SessionState;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidSessionTransition { from: SessionState, to: SessionState },
    #[error("session version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("catalog index has not been loaded")]
    CatalogUnavailable,
    #[error("candidate {0:?} does not belong to this session")]
    UnknownCandidate(CandidateId),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Non-fatal data-quality finding. Recorded against the affected item and
/// logged, never raised as an error: partial input must not abort a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub field: String,
    pub detail: String,
}

impl DataQualityWarning {
    pub fn new(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { field: field.into(), detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::DomainError;
    use crate::session::SessionState;

    #[test]
    fn transition_error_names_both_states() {
        let error = DomainError::InvalidSessionTransition {
            from: SessionState::Finalized,
            to: SessionState::AwaitingReview,
        };
        assert!(error.to_string().contains("Finalized"));
        assert!(error.to_string().contains("AwaitingReview"));
    }
}
