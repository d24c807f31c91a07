//! SQL schema definitions.
//!
//! This module contains the database schema used by SQL backends.
//! The schema is designed to be portable between SQLite and Postgres.
//!
//! Databases recording any other `SCHEMA_VERSION` are refused rather than
//! read with the wrong layout.
//!
//! This version only covers the SQL table layout. The version tag stored
//! inside each session document is separate (see `constants::CURRENT_VERSION`).

use crate::Result;
use crate::backend::errors::BackendError;

use super::SqlxBackend;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
///
/// Each statement uses portable SQL that works on both SQLite and PostgreSQL.
pub const CREATE_TABLES: &[&str] = &[
    // BIGINT (64-bit) used for portability between SQLite and PostgreSQL
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    // One row per document. `position` preserves insertion order within a
    // namespace; `body` is the full JSON object including `_id`.
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY NOT NULL,
        database_name TEXT NOT NULL,
        collection_name TEXT NOT NULL,
        position BIGINT NOT NULL,
        body TEXT NOT NULL
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_documents_namespace ON documents(database_name, collection_name, position)",
];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, records the schema version
/// on first use and rejects databases written with a different version.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .map_err(|e| BackendError::SqlxError {
            reason: format!("Failed to check schema version: {e}"),
            source: Some(e),
        })?;

    if row.is_none() {
        tracing::info!(version = SCHEMA_VERSION, "Initializing SQL schema");
        sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
            .bind(SCHEMA_VERSION)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Failed to initialize schema version: {e}"),
                source: Some(e),
            })?;
    } else if let Some((found,)) = row
        && found != SCHEMA_VERSION
    {
        tracing::warn!(found, expected = SCHEMA_VERSION, "Refusing SQL schema version");
        return Err(BackendError::UnsupportedSchemaVersion {
            found,
            expected: SCHEMA_VERSION,
        }
        .into());
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}
