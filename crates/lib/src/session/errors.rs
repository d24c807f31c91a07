//! Error types for session operations.

use thiserror::Error;

/// Errors raised by session operations independent of storage.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// Only photo and document handles can be cached as sent files.
    #[error("Cannot cache {kind} instance")]
    UnsupportedFileHandle {
        /// Name of the rejected handle variant
        kind: &'static str,
    },
}

impl SessionError {
    /// Check if this error rejects a value of the wrong kind.
    pub fn is_type_error(&self) -> bool {
        matches!(self, SessionError::UnsupportedFileHandle { .. })
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
