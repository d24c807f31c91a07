//! Core document operations for the InMemory store

use super::InMemory;
use crate::{
    Result,
    backend::{Document, Namespace, Update, UpdateOutcome, query},
};

/// Returns a copy of the first document matching `filter`.
pub(crate) async fn find_one(
    backend: &InMemory,
    namespace: &Namespace,
    filter: &Document,
) -> Option<Document> {
    let databases = backend.databases.read().await;
    databases
        .get(namespace.database())
        .and_then(|collections| collections.get(namespace.collection()))
        .and_then(|documents| documents.iter().find(|doc| query::matches(doc, filter)))
        .cloned()
}

/// Returns copies of every document matching `filter`.
pub(crate) async fn find(
    backend: &InMemory,
    namespace: &Namespace,
    filter: &Document,
) -> Vec<Document> {
    let databases = backend.databases.read().await;
    databases
        .get(namespace.database())
        .and_then(|collections| collections.get(namespace.collection()))
        .map(|documents| {
            documents
                .iter()
                .filter(|doc| query::matches(doc, filter))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Applies `update` to the first matching document, inserting one on upsert.
///
/// The write lock is held for the whole operation, so a single update is
/// atomic with respect to other operations on the same store.
pub(crate) async fn update_one(
    backend: &InMemory,
    namespace: &Namespace,
    filter: &Document,
    update: &Update,
    upsert: bool,
) -> Result<UpdateOutcome> {
    update.validate()?;

    let mut databases = backend.databases.write().await;

    if let Some(document) = databases
        .get_mut(namespace.database())
        .and_then(|collections| collections.get_mut(namespace.collection()))
        .and_then(|documents| documents.iter_mut().find(|doc| query::matches(doc, filter)))
    {
        let modified = query::apply_update(document, update)?;
        return Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
            upserted_id: None,
        });
    }

    if !upsert {
        tracing::debug!(namespace = %namespace, "Update matched no document");
        return Ok(UpdateOutcome::default());
    }

    let document = query::upsert_document(filter, update)?;
    let upserted_id = query::document_id(&document);
    databases
        .entry(namespace.database().to_string())
        .or_default()
        .entry(namespace.collection().to_string())
        .or_default()
        .push(document);

    tracing::debug!(namespace = %namespace, id = ?upserted_id, "Inserted document on upsert");
    Ok(UpdateOutcome {
        matched: 0,
        modified: 0,
        upserted_id,
    })
}

/// Removes every collection of `database`.
pub(crate) async fn drop_database(backend: &InMemory, database: &str) {
    let mut databases = backend.databases.write().await;
    if databases.remove(database).is_some() {
        tracing::debug!(database, "Dropped database");
    }
}
