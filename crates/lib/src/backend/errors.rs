//! Error types for the document store backends.
//!
//! This module defines structured error types for backend operations,
//! providing better error context and type safety compared to string-based errors.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Field additions/changes require a major version bump
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Database or collection name rejected when building a namespace.
    #[error("Invalid namespace '{namespace}': {reason}")]
    InvalidNamespace {
        /// The offending `database.collection` pair
        namespace: String,
        /// Why the name was rejected
        reason: String,
    },

    /// Client configuration cannot be turned into a connection.
    #[error("Invalid client configuration: {reason}")]
    InvalidClientConfig {
        /// Description of the problem
        reason: String,
    },

    /// An update names a field that cannot be `$set`.
    #[error("Invalid update for field '{field}': {reason}")]
    InvalidUpdate {
        /// The field named by the update
        field: String,
        /// Why the field was rejected
        reason: String,
    },

    /// An update tried to change a document's `_id`.
    #[error("Field '{field}' is immutable")]
    ImmutableField {
        /// The immutable field
        field: String,
    },

    /// A stored document is not a JSON object.
    #[error("Invalid stored document in {namespace}: {reason}")]
    InvalidDocument {
        /// The namespace holding the document
        namespace: String,
        /// Description of what is wrong with it
        reason: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The SQL tables were written with a schema version this build cannot read.
    #[error("Unsupported SQL schema version {found} (expected {expected})")]
    UnsupportedSchemaVersion {
        /// Version recorded in the database
        found: i64,
        /// Version this build writes
        expected: i64,
    },

    /// SQL backend error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Context for the failed statement
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Check if this error comes from invalid configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BackendError::InvalidNamespace { .. } | BackendError::InvalidClientConfig { .. }
        )
    }

    /// Check if this error is a rejected update.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            BackendError::InvalidUpdate { .. } | BackendError::ImmutableField { .. }
        )
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            BackendError::InvalidDocument { .. } | BackendError::UnsupportedSchemaVersion { .. }
        )
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Check if this error was raised by the SQL driver.
    pub fn is_sql_error(&self) -> bool {
        #[cfg(any(feature = "sqlite", feature = "postgres"))]
        {
            matches!(self, BackendError::SqlxError { .. })
        }
        #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
        {
            false
        }
    }

    /// Get the field name if this error is about a specific field.
    pub fn field(&self) -> Option<&str> {
        match self {
            BackendError::InvalidUpdate { field, .. } | BackendError::ImmutableField { field } => {
                Some(field)
            }
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
