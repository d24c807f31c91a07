//! Backend creation and utility functions.

use std::path::PathBuf;
use std::sync::Arc;

use multisession::backend::{
    BackendImpl, Collection,
    database::{InMemory, Postgres, Sqlite},
};
use multisession::store::CollectionRef;

use crate::cli::{Backend, BackendArgs};

const SQLITE_FILE: &str = "multisession.db";
const JSON_FILE: &str = "multisession.json";

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "postgres://***@<unparsable-url>".to_string()
    }
}

fn data_dir(args: &BackendArgs) -> PathBuf {
    args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Short description of the selected backend for output
pub fn backend_label(args: &BackendArgs) -> String {
    match args.backend {
        Backend::Sqlite => format!("sqlite ({})", data_dir(args).join(SQLITE_FILE).display()),
        Backend::Postgres => match &args.postgres_url {
            Some(url) => format!("postgres ({})", redact_postgres_url(url)),
            None => "postgres".to_string(),
        },
        Backend::Inmemory => format!("inmemory ({})", data_dir(args).join(JSON_FILE).display()),
    }
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    args: &BackendArgs,
) -> Result<Arc<dyn BackendImpl>, Box<dyn std::error::Error>> {
    let data_dir = data_dir(args);

    match args.backend {
        Backend::Sqlite => {
            tokio::fs::create_dir_all(&data_dir).await?;
            let db_path = data_dir.join(SQLITE_FILE);
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(Arc::new(Sqlite::open(&db_path).await?))
        }
        Backend::Postgres => {
            let url = args
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or MULTISESSION_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::info!("Connecting to PostgreSQL backend at {}", display_url);

            match Postgres::connect(url).await {
                Ok(backend) => {
                    tracing::info!("Connected to PostgreSQL successfully");
                    Ok(Arc::new(backend))
                }
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {}: {}", display_url, e).into())
                }
            }
        }
        Backend::Inmemory => {
            let json_path = data_dir.join(JSON_FILE);
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            Ok(Arc::new(InMemory::load_from_file(&json_path).await?))
        }
    }
}

/// Resolve the session collection on `backend`
pub fn open_collection(
    args: &BackendArgs,
    backend: Arc<dyn BackendImpl>,
) -> multisession::Result<Collection> {
    CollectionRef::from(args.collection.clone()).resolve(backend, &args.database)
}

/// Write the in-memory store back to its JSON file; other backends persist on their own
pub async fn persist_backend(
    args: &BackendArgs,
    backend: &Arc<dyn BackendImpl>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(in_memory) = backend.as_any().downcast_ref::<InMemory>() {
        let json_path = data_dir(args).join(JSON_FILE);
        tokio::fs::create_dir_all(data_dir(args)).await?;
        in_memory.save_to_file(&json_path).await?;
        tracing::info!("Saved in-memory store to {}", json_path.display());
    }
    Ok(())
}
