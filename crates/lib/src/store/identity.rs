//! Session identity and collection selection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::backend::{BackendImpl, Collection, Document};
use crate::constants::{API_HASH, API_ID, DEFAULT_COLLECTION, PHONE};

/// The `(api_id, api_hash, phone)` triple selecting one session document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub api_id: i64,
    pub api_hash: String,
    pub phone: String,
}

impl SessionIdentity {
    pub fn new(api_id: i64, api_hash: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            api_id,
            api_hash: api_hash.into(),
            phone: phone.into(),
        }
    }

    /// The equality filter matching this identity's document.
    pub fn filter(&self) -> Document {
        let mut filter = Document::new();
        filter.insert(API_ID.to_string(), Value::from(self.api_id));
        filter.insert(API_HASH.to_string(), Value::from(self.api_hash.clone()));
        filter.insert(PHONE.to_string(), Value::from(self.phone.clone()));
        filter
    }

    /// Read the identity fields of a stored document.
    ///
    /// Returns `None` when any of them is missing or has the wrong type.
    pub fn from_document(document: &Document) -> Option<Self> {
        Some(Self {
            api_id: document.get(API_ID)?.as_i64()?,
            api_hash: document.get(API_HASH)?.as_str()?.to_string(),
            phone: document.get(PHONE)?.as_str()?.to_string(),
        })
    }
}

/// Which collection a session document lives in.
#[derive(Debug, Clone, Default)]
pub enum CollectionRef {
    /// The `telegram` collection of the configured database.
    #[default]
    Default,
    /// A named collection of the configured database.
    Named(String),
    /// An existing handle; its own backend and database are used.
    Handle(Collection),
}

impl CollectionRef {
    /// Resolve to a collection handle on `backend`.
    pub fn resolve(self, backend: Arc<dyn BackendImpl>, database: &str) -> Result<Collection> {
        match self {
            CollectionRef::Default => Collection::new(backend, database, DEFAULT_COLLECTION),
            CollectionRef::Named(name) => Collection::new(backend, database, name),
            CollectionRef::Handle(collection) => Ok(collection),
        }
    }
}

impl From<&str> for CollectionRef {
    fn from(name: &str) -> Self {
        CollectionRef::Named(name.to_string())
    }
}

impl From<String> for CollectionRef {
    fn from(name: String) -> Self {
        CollectionRef::Named(name)
    }
}

impl From<Option<String>> for CollectionRef {
    fn from(name: Option<String>) -> Self {
        name.map_or(CollectionRef::Default, CollectionRef::Named)
    }
}

impl From<Collection> for CollectionRef {
    fn from(collection: Collection) -> Self {
        CollectionRef::Handle(collection)
    }
}
