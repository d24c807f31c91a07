//! CLI argument definitions for the multisession binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use multisession::constants::DEFAULT_DATABASE;

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// SQLite database (default)
    Sqlite,
    /// PostgreSQL database (for shared deployments)
    Postgres,
    /// In-memory with JSON persistence
    Inmemory,
}

/// Inspect and maintain stored messaging sessions
#[derive(Parser, Debug)]
#[command(name = "multisession")]
#[command(about = "Inspect and maintain messaging sessions kept in a document store")]
#[command(version)]
pub struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every stored session identity
    List(ListArgs),
    /// Show the connection info of one identity
    Show(IdentityArgs),
    /// Clear the connection info of one identity
    Logout(IdentityArgs),
}

/// Where the session documents live
#[derive(clap::Args, Debug, Clone)]
pub struct BackendArgs {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "MULTISESSION_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores multisession.db
    /// For InMemory: stores multisession.json
    #[arg(short = 'D', long, env = "MULTISESSION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "MULTISESSION_POSTGRES_URL")]
    pub postgres_url: Option<String>,

    /// Database holding the session collection
    #[arg(long, default_value = DEFAULT_DATABASE, env = "MULTISESSION_DATABASE")]
    pub database: String,

    /// Collection name (defaults to `telegram`)
    #[arg(long, env = "MULTISESSION_COLLECTION")]
    pub collection: Option<String>,
}

/// Arguments for the list command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub backend_config: BackendArgs,
}

/// Arguments selecting a single session identity
#[derive(clap::Args, Debug)]
pub struct IdentityArgs {
    #[command(flatten)]
    pub backend_config: BackendArgs,

    /// Application id
    #[arg(long)]
    pub api_id: i64,

    /// Application hash
    #[arg(long)]
    pub api_hash: String,

    /// Phone number of the account
    #[arg(long)]
    pub phone: String,
}

impl IdentityArgs {
    pub fn identity(&self) -> multisession::SessionIdentity {
        multisession::SessionIdentity::new(self.api_id, self.api_hash.clone(), self.phone.clone())
    }
}
