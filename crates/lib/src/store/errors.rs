//! Error types for the document session store.
//!
//! These cover stored session documents that cannot be interpreted. Storage
//! failures themselves surface as [`crate::backend::BackendError`].

use thiserror::Error;

/// Errors raised while reading a stored session document.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document field does not have the expected shape
    #[error("Malformed field '{field}' in session document: {source}")]
    MalformedField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A stored update cursor date cannot be represented
    #[error("Update state {entity_id} has an out of range timestamp: {seconds}")]
    InvalidTimestamp { entity_id: i64, seconds: i64 },
}

impl StoreError {
    /// Check if this error indicates stored data that cannot be interpreted
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            StoreError::MalformedField { .. } | StoreError::InvalidTimestamp { .. }
        )
    }

    /// Get the document field associated with this error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            StoreError::MalformedField { field, .. } => Some(field),
            StoreError::InvalidTimestamp { .. } => Some(crate::constants::UPDATE_STATES),
        }
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
