//! Client and store configuration.
//!
//! Both types deserialize from JSON with defaults for every optional field:
//!
//! ```
//! use multisession::config::{ClientConfig, StoreConfig};
//!
//! let config = StoreConfig::from_json_str(
//!     r#"{"client": {"kind": "postgres", "user": "app"}, "collection": "accounts"}"#,
//! )
//! .unwrap();
//! assert_eq!(config.database, "multisession");
//! assert!(matches!(config.client, ClientConfig::Postgres { port: 5432, .. }));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{BackendImpl, database::InMemory};
use crate::constants::{DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_POSTGRES_PORT};

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_POSTGRES_PORT
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_true() -> bool {
    true
}

/// How to reach the document store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientConfig {
    /// Process-local store, optionally loaded from a JSON file.
    ///
    /// A session opened from this configuration writes the file back on
    /// `save` and `close`.
    InMemory {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// SQLite database file, created if missing.
    Sqlite { path: PathBuf },
    /// PostgreSQL server.
    Postgres {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        dbname: Option<String>,
        /// Extra connection parameters appended to the URL query.
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::InMemory { path: None }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientConfig::InMemory { path } => {
                f.debug_struct("InMemory").field("path", path).finish()
            }
            ClientConfig::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            ClientConfig::Postgres {
                host,
                port,
                user,
                password,
                dbname,
                options,
            } => f
                .debug_struct("Postgres")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &password.as_ref().map(|_| "***"))
                .field("dbname", dbname)
                .field("options", options)
                .finish(),
        }
    }
}

impl ClientConfig {
    /// Build the connection URL of a PostgreSQL configuration.
    pub fn postgres_url(&self) -> Result<String> {
        let ClientConfig::Postgres {
            host,
            port,
            user,
            password,
            dbname,
            options,
        } = self
        else {
            return Err(invalid_config("not a PostgreSQL configuration"));
        };

        let mut url = url::Url::parse(&format!("postgres://{host}:{port}"))
            .map_err(|e| invalid_config(&format!("invalid host '{host}': {e}")))?;
        if let Some(user) = user {
            url.set_username(user)
                .map_err(|()| invalid_config("cannot set user name"))?;
        }
        if password.is_some() {
            url.set_password(password.as_deref())
                .map_err(|()| invalid_config("cannot set password"))?;
        }
        if let Some(dbname) = dbname {
            url.set_path(&format!("/{}", dbname.trim_start_matches('/')));
        }
        if !options.is_empty() {
            url.query_pairs_mut().extend_pairs(options.iter());
        }
        Ok(url.to_string())
    }

    /// Construct the configured backend.
    /// The JSON file backing an in-memory store, if any.
    pub fn persist_path(&self) -> Option<&Path> {
        match self {
            ClientConfig::InMemory { path } => path.as_deref(),
            _ => None,
        }
    }

    pub async fn connect(&self) -> Result<Arc<dyn BackendImpl>> {
        match self {
            ClientConfig::InMemory { path: Some(path) } => {
                tracing::debug!(path = %path.display(), "Loading in-memory store");
                Ok(Arc::new(InMemory::load_from_file(path).await?))
            }
            ClientConfig::InMemory { path: None } => Ok(Arc::new(InMemory::new())),
            #[cfg(feature = "sqlite")]
            ClientConfig::Sqlite { path } => {
                tracing::debug!(path = %path.display(), "Opening SQLite store");
                Ok(Arc::new(crate::backend::database::Sqlite::open(path).await?))
            }
            #[cfg(not(feature = "sqlite"))]
            ClientConfig::Sqlite { .. } => Err(invalid_config("SQLite support is not enabled")),
            #[cfg(feature = "postgres")]
            ClientConfig::Postgres { host, port, .. } => {
                tracing::debug!(host = %host, port = *port, "Connecting to PostgreSQL store");
                let url = self.postgres_url()?;
                Ok(Arc::new(crate::backend::database::Postgres::connect(&url).await?))
            }
            #[cfg(not(feature = "postgres"))]
            ClientConfig::Postgres { .. } => {
                Err(invalid_config("PostgreSQL support is not enabled"))
            }
        }
    }
}

fn invalid_config(reason: &str) -> crate::Error {
    BackendError::InvalidClientConfig {
        reason: reason.to_string(),
    }
    .into()
}

/// Everything needed to open a [`crate::store::DocumentSession`] besides its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default = "default_database")]
    pub database: String,
    /// Collection name; `telegram` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default = "default_true")]
    pub save_entities: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            database: default_database(),
            collection: None,
            save_entities: true,
        }
    }
}

impl StoreConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
