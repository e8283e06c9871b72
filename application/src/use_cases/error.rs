//! Errors of the feedback and management use cases

use crate::ports::store::StoreError;
use council_domain::DomainError;
use thiserror::Error;

/// Errors returned by operations outside the review pipeline
#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Rejected state transition or invalid value
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl CouncilError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CouncilError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CouncilError::NotFound { .. })
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, CouncilError::Domain(e) if e.is_invalid_transition())
    }
}

impl From<StoreError> for CouncilError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => CouncilError::NotFound {
                kind: collection,
                id,
            },
            other => CouncilError::Store(other),
        }
    }
}
