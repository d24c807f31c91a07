//! Constants used throughout the multisession library.
//!
//! This module provides central definitions for document field names,
//! the session schema version and configuration defaults.

/// Version tag written into every session document on open.
pub const CURRENT_VERSION: i64 = 1;

/// Identity field holding the application (API) id.
pub const API_ID: &str = "api_id";

/// Identity field holding the application (API) hash.
pub const API_HASH: &str = "api_hash";

/// Identity field holding the account phone number.
pub const PHONE: &str = "phone";

/// Connection info list (at most one entry).
pub const SESSIONS: &str = "sessions";

/// Cached peer entities.
pub const ENTITIES: &str = "entities";

/// Sent-file fingerprints.
pub const SENT_FILES: &str = "sent_files";

/// Per-entity update cursors.
pub const UPDATE_STATES: &str = "update_states";

/// Schema version list.
pub const VERSIONS: &str = "versions";

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "telegram";

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "multisession";

/// Host used for network backends when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// PostgreSQL port used when none is configured.
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
