//! In-memory document store implementation
//!
//! This module provides an in-memory implementation of the `BackendImpl` trait,
//! suitable for testing, development, or single-process deployments where the
//! whole store can be saved to and loaded from a JSON file.

mod persistence;
mod storage;

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;
use crate::backend::{BackendImpl, Document, Namespace, Update, UpdateOutcome};

/// Documents grouped by database name, then collection name.
pub(crate) type Databases = BTreeMap<String, BTreeMap<String, Vec<Document>>>;

/// A simple in-memory document store.
///
/// Documents are kept per collection in insertion order, which is the order
/// `find_one` and `find` scan them in.
///
/// It provides basic persistence capabilities via `save_to_file` and
/// `load_from_file`, serializing every database to JSON.
///
/// **Security Note**: Session documents hold authorization keys. They are kept
/// in memory and written to disk in plaintext by this implementation.
#[derive(Debug, Default)]
pub struct InMemory {
    /// All databases with a read-write lock for concurrent access
    pub(crate) databases: RwLock<Databases>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all databases holding at least one collection.
    pub async fn database_names(&self) -> Vec<String> {
        let databases = self.databases.read().await;
        databases.keys().cloned().collect()
    }

    /// Returns the names of the collections of `database`.
    pub async fn collection_names(&self, database: &str) -> Vec<String> {
        let databases = self.databases.read().await;
        databases
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Saves the entire store state to a specified file as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    ///
    /// # Returns
    /// A `Result` indicating success or an I/O or serialization error.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads the store state from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` store is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    ///
    /// # Returns
    /// A `Result` containing the loaded `InMemory` store or an I/O or deserialization error.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }
}

#[async_trait]
impl BackendImpl for InMemory {
    async fn find_one(&self, namespace: &Namespace, filter: &Document) -> Result<Option<Document>> {
        Ok(storage::find_one(self, namespace, filter).await)
    }

    async fn find(&self, namespace: &Namespace, filter: &Document) -> Result<Vec<Document>> {
        Ok(storage::find(self, namespace, filter).await)
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Document,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        storage::update_one(self, namespace, filter, update, upsert).await
    }

    async fn drop_database(&self, database: &str) -> Result<()> {
        storage::drop_database(self, database).await;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
