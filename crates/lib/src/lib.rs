//!
//! Multisession: messaging client session state kept in a shared document store.
//!
//! Several processes, or several client instances, can resume the same
//! session by opening it under the same identity: API id, API hash and phone
//! number.
//!
//! ## Core Concepts
//!
//! * **Sessions (`session::Session`)**: The interface a messaging client uses to read and write its session state: data center binding, authorization key, cached peers, sent-file fingerprints and update cursors.
//! * **Memory sessions (`session::MemorySession`)**: A session kept entirely in process memory.
//! * **Document sessions (`store::DocumentSession`)**: A session persisted as one document per identity, written through on every change.
//! * **Backends (`backend::BackendImpl`)**: A pluggable document store addressed by database and collection name, with in-memory, SQLite and PostgreSQL implementations.
//! * **Configuration (`config::StoreConfig`)**: Backend selection plus database and collection names.

pub mod backend;
pub mod config;
pub mod constants;
pub mod session;
pub mod store;

pub use session::Session;
pub use store::{DocumentSession, SessionIdentity};

/// Result type used throughout the multisession library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the multisession library.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Structured document errors from the store module
    #[error(transparent)]
    Store(store::StoreError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Backend(_) => "backend",
            Error::Session(_) => "session",
            Error::Store(_) => "store",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error comes from invalid configuration.
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_config_error(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error rejects a value of the wrong kind.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Session(session_err) => session_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_integrity_error(),
            Error::Store(store_err) => store_err.is_integrity_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error is database/backend-related.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}
