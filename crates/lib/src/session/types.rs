//! Value types exchanged between a session and its consumer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::SessionError;

/// Authorization key material for a data center.
///
/// The bytes are wiped when the key is dropped and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthKey {
    key: Vec<u8>,
}

impl AuthKey {
    /// Wrap raw key bytes. Empty input means there is no key.
    pub fn new(key: impl Into<Vec<u8>>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() {
            None
        } else {
            Some(Self { key })
        }
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Always false; empty keys are never constructed.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Short hex digest identifying the key without revealing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.key);
        hex::encode(&digest[..8])
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthKey({})", self.fingerprint())
    }
}

/// Position markers used to resume update delivery for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateState {
    pub pts: i32,
    pub qts: i32,
    pub date: DateTime<Utc>,
    pub seq: i32,
    pub unread_count: i32,
}

impl UpdateState {
    /// Create a state with no unread messages.
    pub fn new(pts: i32, qts: i32, date: DateTime<Utc>, seq: i32) -> Self {
        Self {
            pts,
            qts,
            date,
            seq,
            unread_count: 0,
        }
    }
}

/// A cached peer: marked id, access hash and lookup attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    /// Marked peer id (see [`super::peer::get_peer_id`]).
    pub id: i64,
    /// Access hash, 0 for basic chats.
    pub hash: i64,
    /// Lower-cased username.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl EntityRow {
    /// The `(id, access_hash)` pair returned by entity lookups.
    pub fn id_and_hash(&self) -> (i64, i64) {
        (self.id, self.hash)
    }
}

/// A remote file handle.
///
/// Only [`InputFile::Photo`] and [`InputFile::Document`] refer to files that
/// already live on the server and can be reused; the upload variants describe
/// a file being sent for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    Photo { id: i64, access_hash: i64 },
    Document { id: i64, access_hash: i64 },
    Uploaded { id: i64, parts: i32, name: String },
    UploadedBig { id: i64, parts: i32, name: String },
}

impl InputFile {
    /// The file id.
    pub fn id(&self) -> i64 {
        match self {
            InputFile::Photo { id, .. }
            | InputFile::Document { id, .. }
            | InputFile::Uploaded { id, .. }
            | InputFile::UploadedBig { id, .. } => *id,
        }
    }

    /// The access hash of a reusable handle.
    pub fn access_hash(&self) -> Option<i64> {
        match self {
            InputFile::Photo { access_hash, .. } | InputFile::Document { access_hash, .. } => {
                Some(*access_hash)
            }
            _ => None,
        }
    }

    /// Name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            InputFile::Photo { .. } => "InputPhoto",
            InputFile::Document { .. } => "InputDocument",
            InputFile::Uploaded { .. } => "InputFile",
            InputFile::UploadedBig { .. } => "InputFileBig",
        }
    }

    /// Build the reusable handle for a cached file of the given type.
    pub fn from_sent(kind: SentFileType, id: i64, access_hash: i64) -> Self {
        match kind {
            SentFileType::Photo => InputFile::Photo { id, access_hash },
            SentFileType::Document => InputFile::Document { id, access_hash },
        }
    }
}

/// Variant tag stored with a sent-file fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SentFileType {
    Document = 0,
    Photo = 1,
}

impl SentFileType {
    /// The integer stored in documents.
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Parse a stored tag.
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(SentFileType::Document),
            1 => Some(SentFileType::Photo),
            _ => None,
        }
    }
}

impl TryFrom<&InputFile> for SentFileType {
    type Error = SessionError;

    fn try_from(file: &InputFile) -> Result<Self, Self::Error> {
        match file {
            InputFile::Photo { .. } => Ok(SentFileType::Photo),
            InputFile::Document { .. } => Ok(SentFileType::Document),
            other => Err(SessionError::UnsupportedFileHandle {
                kind: other.kind_name(),
            }),
        }
    }
}

/// A resolved peer ready to be addressed in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPeer {
    User { user_id: i64, access_hash: i64 },
    Chat { chat_id: i64 },
    Channel { channel_id: i64, access_hash: i64 },
}

/// Key accepted by [`super::Session::get_input_entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    /// A raw or marked peer id.
    Id(i64),
    /// A phone number, username, link or display name.
    Text(String),
}

impl From<i64> for EntityKey {
    fn from(id: i64) -> Self {
        EntityKey::Id(id)
    }
}

impl From<&str> for EntityKey {
    fn from(text: &str) -> Self {
        EntityKey::Text(text.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(text: String) -> Self {
        EntityKey::Text(text)
    }
}
