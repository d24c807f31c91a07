//! Document storage operations for SQL backends.
//!
//! This module implements find and update operations using sqlx.

use serde_json::Value;

use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{Document, Namespace, Update, UpdateOutcome, query};

use super::{SqlxBackend, SqlxResultExt};

const SELECT_NAMESPACE: &str = "SELECT id, body FROM documents
     WHERE database_name = $1 AND collection_name = $2
     ORDER BY position";

/// Decode a stored body into a document.
fn decode_body(namespace: &Namespace, body: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| BackendError::DeserializationFailed { source: e })?;
    match value {
        Value::Object(document) => Ok(document),
        other => Err(BackendError::InvalidDocument {
            namespace: namespace.to_string(),
            reason: format!("expected a JSON object, found {other}"),
        }
        .into()),
    }
}

/// Encode a document for storage.
fn encode_body(document: &Document) -> Result<String> {
    serde_json::to_string(document)
        .map_err(|e| BackendError::SerializationFailed { source: e }.into())
}

/// Load every document of a namespace, in insertion order.
async fn load_namespace<'e, E>(
    executor: E,
    namespace: &Namespace,
) -> Result<Vec<(String, Document)>>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let rows: Vec<(String, String)> = sqlx::query_as(SELECT_NAMESPACE)
        .bind(namespace.database().to_string())
        .bind(namespace.collection().to_string())
        .fetch_all(executor)
        .await
        .sql_context("Failed to load documents")?;

    rows.into_iter()
        .map(|(id, body)| Ok((id, decode_body(namespace, &body)?)))
        .collect()
}

/// Get the first document matching `filter`.
pub async fn find_one(
    backend: &SqlxBackend,
    namespace: &Namespace,
    filter: &Document,
) -> Result<Option<Document>> {
    let documents = load_namespace(backend.pool(), namespace).await?;
    Ok(documents
        .into_iter()
        .map(|(_, document)| document)
        .find(|document| query::matches(document, filter)))
}

/// Get every document matching `filter`.
pub async fn find(
    backend: &SqlxBackend,
    namespace: &Namespace,
    filter: &Document,
) -> Result<Vec<Document>> {
    let documents = load_namespace(backend.pool(), namespace).await?;
    Ok(documents
        .into_iter()
        .map(|(_, document)| document)
        .filter(|document| query::matches(document, filter))
        .collect())
}

/// Apply `update` to the first matching document, inserting one on upsert.
///
/// The lookup and the write share one transaction.
pub async fn update_one(
    backend: &SqlxBackend,
    namespace: &Namespace,
    filter: &Document,
    update: &Update,
    upsert: bool,
) -> Result<UpdateOutcome> {
    update.validate()?;

    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let documents = load_namespace(&mut *tx, namespace).await?;
    let existing = documents
        .into_iter()
        .find(|(_, document)| query::matches(document, filter));

    let outcome = match existing {
        Some((id, mut document)) => {
            let modified = query::apply_update(&mut document, update)?;
            if modified {
                sqlx::query("UPDATE documents SET body = $1 WHERE id = $2")
                    .bind(encode_body(&document)?)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .sql_context("Failed to update document")?;
            }
            UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
                upserted_id: None,
            }
        }
        None if upsert => {
            let document = query::upsert_document(filter, update)?;
            let id = query::document_id(&document)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let (position,): (i64,) = sqlx::query_as(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM documents
                 WHERE database_name = $1 AND collection_name = $2",
            )
            .bind(namespace.database().to_string())
            .bind(namespace.collection().to_string())
            .fetch_one(&mut *tx)
            .await
            .sql_context("Failed to compute document position")?;

            sqlx::query(
                "INSERT INTO documents (id, database_name, collection_name, position, body)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id.clone())
            .bind(namespace.database().to_string())
            .bind(namespace.collection().to_string())
            .bind(position)
            .bind(encode_body(&document)?)
            .execute(&mut *tx)
            .await
            .sql_context("Failed to insert document")?;

            tracing::debug!(namespace = %namespace, id = %id, "Inserted document on upsert");
            UpdateOutcome {
                matched: 0,
                modified: 0,
                upserted_id: Some(id),
            }
        }
        None => {
            tracing::debug!(namespace = %namespace, "Update matched no document");
            UpdateOutcome::default()
        }
    };

    tx.commit().await.sql_context("Failed to commit transaction")?;
    Ok(outcome)
}

/// Delete every document of a database.
pub async fn drop_database(backend: &SqlxBackend, database: &str) -> Result<()> {
    sqlx::query("DELETE FROM documents WHERE database_name = $1")
        .bind(database.to_string())
        .execute(backend.pool())
        .await
        .sql_context("Failed to drop database")?;
    Ok(())
}
