//! Typed view of a stored session document.
//!
//! A session document looks like:
//!
//! ```json
//! {
//!   "api_id": 611335, "api_hash": "hash", "phone": "9996621234",
//!   "sessions": [{"dc_id": 2, "server_address": "149.154.167.40", "port": 80,
//!                 "auth_key": null, "takeout_id": null}],
//!   "entities": [], "sent_files": [], "update_states": [],
//!   "versions": [{"version": 1}]
//! }
//! ```
//!
//! Byte fields are stored as base64 strings and cursor dates as epoch seconds.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::StoreError;
use crate::Result;
use crate::backend::Document;
use crate::constants::{CURRENT_VERSION, ENTITIES, SENT_FILES, SESSIONS, UPDATE_STATES, VERSIONS};
use crate::session::{AuthKey, EntityRow, InputFile, SentFileType, UpdateState};

/// Serde adapter storing optional bytes as a base64 string.
mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&Base64::encode_string(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| Base64::decode_vec(&encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Data center binding and key material. A document holds at most one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default)]
    pub dc_id: Option<i32>,
    #[serde(default)]
    pub server_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, with = "base64_bytes")]
    pub auth_key: Option<Vec<u8>>,
    #[serde(default)]
    pub takeout_id: Option<i64>,
}

impl ConnectionInfo {
    /// The stored key, treating empty bytes as no key.
    pub fn auth_key(&self) -> Option<AuthKey> {
        self.auth_key.clone().and_then(AuthKey::new)
    }
}

/// A cached sent file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentFileRecord {
    pub id: i64,
    #[serde(default, with = "base64_bytes")]
    pub md5_digest: Option<Vec<u8>>,
    #[serde(default)]
    pub file_size: Option<i64>,
    /// [`SentFileType`] tag.
    #[serde(rename = "type", default)]
    pub kind: Option<i32>,
    #[serde(default)]
    pub hash: Option<i64>,
}

impl SentFileRecord {
    pub fn new(md5_digest: &[u8], file_size: i64, kind: SentFileType, file: &InputFile) -> Self {
        Self {
            id: file.id(),
            md5_digest: Some(md5_digest.to_vec()),
            file_size: Some(file_size),
            kind: Some(kind.tag()),
            hash: file.access_hash(),
        }
    }

    /// The reusable handle if this record matches the fingerprint.
    pub fn handle_for(
        &self,
        md5_digest: &[u8],
        file_size: i64,
        kind: SentFileType,
    ) -> Option<InputFile> {
        let matches = self.md5_digest.as_deref() == Some(md5_digest)
            && self.file_size == Some(file_size)
            && self.kind.and_then(SentFileType::from_tag) == Some(kind);
        if !matches {
            return None;
        }
        Some(InputFile::from_sent(kind, self.id, self.hash?))
    }
}

/// A stored update cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStateRecord {
    pub id: i64,
    #[serde(default)]
    pub pts: Option<i32>,
    #[serde(default)]
    pub qts: Option<i32>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub seq: Option<i32>,
}

impl UpdateStateRecord {
    pub fn from_state(entity_id: i64, state: &UpdateState) -> Self {
        Self {
            id: entity_id,
            pts: Some(state.pts),
            qts: Some(state.qts),
            date: Some(state.date.timestamp()),
            seq: Some(state.seq),
        }
    }

    /// Materialize the cursor. Missing counters read as 0, a missing date as the epoch.
    pub fn to_state(&self) -> Result<UpdateState> {
        let seconds = self.date.unwrap_or_default();
        let date: DateTime<Utc> =
            DateTime::from_timestamp(seconds, 0).ok_or(StoreError::InvalidTimestamp {
                entity_id: self.id,
                seconds,
            })?;
        Ok(UpdateState::new(
            self.pts.unwrap_or_default(),
            self.qts.unwrap_or_default(),
            date,
            self.seq.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    pub version: Option<i64>,
}

impl VersionRecord {
    pub fn current() -> Self {
        Self {
            version: Some(CURRENT_VERSION),
        }
    }
}

/// The session lists of a stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDocument {
    pub sessions: Vec<ConnectionInfo>,
    pub entities: Vec<EntityRow>,
    pub sent_files: Vec<SentFileRecord>,
    pub update_states: Vec<UpdateStateRecord>,
    pub versions: Vec<VersionRecord>,
}

impl SessionDocument {
    /// An empty document at the current version.
    pub fn fresh() -> Self {
        Self {
            versions: vec![VersionRecord::current()],
            ..Default::default()
        }
    }

    /// Parse the session lists of `document`. Missing or null lists read as empty.
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            sessions: list(document, SESSIONS)?,
            entities: list(document, ENTITIES)?,
            sent_files: list(document, SENT_FILES)?,
            update_states: list(document, UPDATE_STATES)?,
            versions: list(document, VERSIONS)?,
        })
    }

    /// The session lists as document fields, ready for a `$set`.
    pub fn to_document(&self) -> Result<Document> {
        let mut document = Document::new();
        document.insert(SESSIONS.to_string(), serde_json::to_value(&self.sessions)?);
        document.insert(ENTITIES.to_string(), serde_json::to_value(&self.entities)?);
        document.insert(SENT_FILES.to_string(), serde_json::to_value(&self.sent_files)?);
        document.insert(
            UPDATE_STATES.to_string(),
            serde_json::to_value(&self.update_states)?,
        );
        document.insert(VERSIONS.to_string(), serde_json::to_value(&self.versions)?);
        Ok(document)
    }

    /// The current connection info, if any.
    pub fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.sessions.last()
    }

    /// The schema version recorded in the document.
    pub fn version(&self) -> Option<i64> {
        self.versions.first().and_then(|record| record.version)
    }
}

/// Read the list stored under `field`, typed as `T`.
pub(crate) fn list<T: DeserializeOwned>(
    document: &Document,
    field: &'static str,
) -> Result<Vec<T>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|source| StoreError::MalformedField { field, source }.into()),
    }
}

/// Ids of `entries`, skipping entries without one.
pub(crate) fn entry_ids(entries: &[Value]) -> Vec<i64> {
    entries
        .iter()
        .filter_map(|entry| entry.get("id").and_then(Value::as_i64))
        .collect()
}
