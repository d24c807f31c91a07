//! Backend implementations for multisession storage
//!
//! This module provides the core `BackendImpl` trait and the document store
//! implementations organized by category.
//!
//! The `BackendImpl` trait defines a small document-store protocol: find one
//! document by an equality filter, and update one document with a `$set` of
//! named top-level fields, optionally inserting it when nothing matches. This
//! keeps the session logic (`DocumentSession`) independent of the specific
//! storage mechanism.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::Result;

// Category modules
pub mod database;
pub mod errors;
pub(crate) mod query;

pub use errors::BackendError;

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Name of the identifier field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// A `(database, collection)` pair addressing a set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Build a namespace, validating both names.
    ///
    /// Database names must be non-empty and may not contain `/\. "$` or NUL.
    /// Collection names must be non-empty, may not contain `$` or NUL and may
    /// not start with the reserved `system.` prefix.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Result<Self> {
        let database = database.into();
        let collection = collection.into();
        let invalid = |reason: &str| -> crate::Error {
            BackendError::InvalidNamespace {
                namespace: format!("{database}.{collection}"),
                reason: reason.to_string(),
            }
            .into()
        };

        if database.is_empty() {
            return Err(invalid("database name is empty"));
        }
        if database
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '.' | ' ' | '"' | '$' | '\0'))
        {
            return Err(invalid("database name contains a reserved character"));
        }
        if collection.is_empty() {
            return Err(invalid("collection name is empty"));
        }
        if collection.contains('$') || collection.contains('\0') {
            return Err(invalid("collection name contains a reserved character"));
        }
        if collection.starts_with("system.") {
            return Err(invalid("collection names starting with 'system.' are reserved"));
        }

        Ok(Self {
            database,
            collection,
        })
    }

    /// The database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A `$set` update: named top-level fields replaced with new values.
///
/// Fields that are not named keep their stored value. Nested paths are not
/// supported; field names containing `.` or starting with `$` are rejected
/// by [`Update::validate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
}

impl Update {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single field.
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    /// Set every field of `document`.
    pub fn set_all(mut self, document: Document) -> Self {
        self.set.extend(document);
        self
    }

    /// The fields this update sets.
    pub fn fields(&self) -> &Document {
        &self.set
    }

    /// Check that every field name can be set.
    pub fn validate(&self) -> Result<()> {
        for field in self.set.keys() {
            let reason = if field.is_empty() {
                Some("field name is empty")
            } else if field.starts_with('$') {
                Some("operators are not supported inside $set")
            } else if field.contains('.') {
                Some("nested paths are not supported")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(BackendError::InvalidUpdate {
                    field: field.clone(),
                    reason: reason.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// The result of an `update_one` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the filter (0 or 1).
    pub matched: u64,
    /// Number of documents whose content changed (0 or 1).
    pub modified: u64,
    /// `_id` of the inserted document when the update was an upsert insert.
    pub upserted_id: Option<String>,
}

/// Backend trait abstracting the underlying document store.
///
/// All backend implementations must be `Send` and `Sync` to allow sharing
/// one client between many sessions, and implement `Any` to allow for
/// downcasting (e.g. to save an [`database::InMemory`] store to disk).
///
/// Filters are equality filters: a document matches when every field of the
/// filter is present in the document with an equal JSON value.
#[async_trait]
pub trait BackendImpl: Send + Sync + Any {
    /// Return the first document in `namespace` matching `filter`, in insertion order.
    async fn find_one(&self, namespace: &Namespace, filter: &Document) -> Result<Option<Document>>;

    /// Return every document in `namespace` matching `filter`, in insertion order.
    async fn find(&self, namespace: &Namespace, filter: &Document) -> Result<Vec<Document>>;

    /// Apply `update` to the first document matching `filter`.
    ///
    /// When nothing matches and `upsert` is set, a new document is inserted
    /// holding the filter fields, the updated fields and a fresh `_id`.
    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Document,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Count documents in `namespace` matching `filter`.
    async fn count(&self, namespace: &Namespace, filter: &Document) -> Result<u64> {
        Ok(self.find(namespace, filter).await?.len() as u64)
    }

    /// Remove every collection of the named database.
    async fn drop_database(&self, database: &str) -> Result<()>;

    /// Returns a reference to the backend as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A handle to one collection of a shared backend.
///
/// Cloning a `Collection` is cheap; all clones talk to the same backend.
#[derive(Clone)]
pub struct Collection {
    backend: Arc<dyn BackendImpl>,
    namespace: Namespace,
}

impl Collection {
    /// Create a handle for `database.name` on `backend`.
    pub fn new(
        backend: Arc<dyn BackendImpl>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            namespace: Namespace::new(database, name)?,
        })
    }

    /// The namespace addressed by this handle.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        self.namespace.collection()
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<dyn BackendImpl> {
        &self.backend
    }

    /// See [`BackendImpl::find_one`].
    pub async fn find_one(&self, filter: &Document) -> Result<Option<Document>> {
        self.backend.find_one(&self.namespace, filter).await
    }

    /// See [`BackendImpl::find`].
    pub async fn find(&self, filter: &Document) -> Result<Vec<Document>> {
        self.backend.find(&self.namespace, filter).await
    }

    /// See [`BackendImpl::update_one`].
    pub async fn update_one(
        &self,
        filter: &Document,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        self.backend
            .update_one(&self.namespace, filter, update, upsert)
            .await
    }

    /// See [`BackendImpl::count`].
    pub async fn count(&self, filter: &Document) -> Result<u64> {
        self.backend.count(&self.namespace, filter).await
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
