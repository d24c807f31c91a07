//! Session persistence in a shared document store.
//!
//! A [`DocumentSession`] keeps one document per [`SessionIdentity`] in a
//! [`Collection`]. Every setter writes through immediately with a
//! read-modify-write of the single field it changes:
//!
//! 1. load the identity's document
//! 2. merge the changed list
//! 3. `$set` that list back, inserting the document if needed
//!
//! Nothing locks the document between steps, so two writers racing on the
//! same identity can lose one another's appends.
//!
//! ```no_run
//! use multisession::config::StoreConfig;
//! use multisession::session::Session;
//! use multisession::store::{DocumentSession, SessionIdentity};
//!
//! # async fn example() -> multisession::Result<()> {
//! let identity = SessionIdentity::new(611335, "hash", "9996621234");
//! let mut session = DocumentSession::open(identity, &StoreConfig::default()).await?;
//! session.set_dc(2, "149.154.167.40", 80).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::Result;
use crate::backend::{BackendImpl, Collection, Document, Update, database::InMemory};
use crate::config::StoreConfig;
use crate::constants::{ENTITIES, SENT_FILES, SESSIONS, UPDATE_STATES, VERSIONS};
use crate::session::{
    AuthKey, EntityRow, InputFile, MemorySession, Peer, SentFileType, Session, UpdateState,
    peer::marked_ids,
};

pub mod document;
pub mod errors;
pub mod identity;

pub use document::{
    ConnectionInfo, SentFileRecord, SessionDocument, UpdateStateRecord, VersionRecord,
};
pub use errors::StoreError;
pub use identity::{CollectionRef, SessionIdentity};

/// A session persisted in a document store.
///
/// Connection info and entity rows are mirrored in an embedded
/// [`MemorySession`]; update states, sent files and entity lookups are read
/// from the store on every call.
#[derive(Debug)]
pub struct DocumentSession {
    memory: MemorySession,
    identity: SessionIdentity,
    filter: Document,
    collection: Collection,
    /// File an in-memory store is written back to.
    persist_path: Option<PathBuf>,
}

impl DocumentSession {
    /// Connect to the configured backend and open the session for `identity`.
    ///
    /// For a file-backed in-memory store, [`Session::save`] and
    /// [`Session::close`] write the whole store back to that file.
    pub async fn open(identity: SessionIdentity, config: &StoreConfig) -> Result<Self> {
        let backend = config.client.connect().await?;
        let mut session =
            Self::open_with_backend(identity, backend, &config.database, config.collection.clone())
                .await?;
        session.set_save_entities(config.save_entities);
        session.persist_path = config.client.persist_path().map(Path::to_path_buf);
        Ok(session)
    }

    /// Open the session for `identity` on an existing backend.
    ///
    /// The document is created if missing. An existing document keeps only
    /// its newest connection info, which is loaded into memory together with
    /// the cached entities.
    pub async fn open_with_backend(
        identity: SessionIdentity,
        backend: Arc<dyn BackendImpl>,
        database: &str,
        collection: impl Into<CollectionRef>,
    ) -> Result<Self> {
        let collection = collection.into().resolve(backend, database)?;
        let filter = identity.filter();
        let mut session = Self {
            memory: MemorySession::new(),
            identity,
            filter,
            collection,
            persist_path: None,
        };
        session.prepare().await?;
        Ok(session)
    }

    async fn prepare(&mut self) -> Result<()> {
        let update = match self.load_document().await? {
            None => {
                info!(
                    namespace = %self.collection.namespace(),
                    api_id = self.identity.api_id,
                    "Creating session document"
                );
                Update::new().set_all(SessionDocument::fresh().to_document()?)
            }
            Some(stored) => {
                let mut update = Update::new().set(
                    VERSIONS,
                    serde_json::to_value([VersionRecord::current()])?,
                );
                for field in [SESSIONS, ENTITIES, SENT_FILES, UPDATE_STATES] {
                    if matches!(stored.get(field), None | Some(Value::Null)) {
                        update = update.set(field, Value::Array(Vec::new()));
                    }
                }

                let sessions: Vec<ConnectionInfo> = document::list(&stored, SESSIONS)?;
                if let Some(info) = sessions.last() {
                    self.memory.assign_dc(info.dc_id, info.server_address.clone(), info.port);
                    self.memory.assign_auth_key(info.auth_key());
                    self.memory.assign_takeout_id(info.takeout_id);
                    if sessions.len() > 1 {
                        debug!(dropped = sessions.len() - 1, "Truncating connection info history");
                    }
                    update = update.set(SESSIONS, serde_json::to_value([info])?);
                }

                self.memory
                    .replace_entities(document::list(&stored, ENTITIES)?);
                debug!(
                    api_id = self.identity.api_id,
                    dc_id = ?self.memory.dc_id(),
                    entities = self.memory.entity_rows().len(),
                    "Loaded session document"
                );
                update
            }
        };

        self.collection.update_one(&self.filter, &update, true).await?;
        Ok(())
    }

    /// The equality filter selecting this session's document.
    pub fn session_filter(&self) -> &Document {
        &self.filter
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The in-memory mirror of connection info and entities.
    pub fn memory(&self) -> &MemorySession {
        &self.memory
    }

    /// Read the raw stored document.
    pub async fn load_document(&self) -> Result<Option<Document>> {
        self.collection.find_one(&self.filter).await
    }

    /// Copy the data center binding and `save_entities` flag into a new memory session.
    pub async fn clone_to_memory(&self) -> Result<MemorySession> {
        let mut target = MemorySession::new();
        self.clone_to(&mut target).await?;
        Ok(target)
    }

    /// Adopt the state of another session.
    ///
    /// Entities and connection parameters are always taken. The auth key is
    /// taken when `copy_auth_key` is set; update states are replayed through
    /// [`Session::set_update_state`] when `copy_update_states` is set, so
    /// cursors already stored here are kept.
    pub async fn import_from(
        &mut self,
        other: &MemorySession,
        copy_auth_key: bool,
        copy_update_states: bool,
    ) -> Result<()> {
        if copy_auth_key {
            self.memory.assign_auth_key(other.auth_key().cloned());
        }
        self.memory.replace_entities(other.entity_rows().to_vec());
        self.memory.assign_dc(
            other.dc_id(),
            other.server_address().map(str::to_string),
            other.port(),
        );
        self.persist_connection_info().await?;

        if self.save_entities() {
            self.persist_rows(other.entity_rows()).await?;
        }

        if copy_update_states {
            for (entity_id, state) in other.update_states() {
                self.set_update_state(entity_id, state.clone()).await?;
            }
        }
        Ok(())
    }

    /// Replace the stored connection info with the in-memory one.
    async fn persist_connection_info(&self) -> Result<()> {
        let info = ConnectionInfo {
            dc_id: self.memory.dc_id(),
            server_address: self.memory.server_address().map(str::to_string),
            port: self.memory.port(),
            auth_key: self.memory.auth_key().map(|key| key.as_bytes().to_vec()),
            takeout_id: self.memory.takeout_id(),
        };
        let update = Update::new().set(SESSIONS, serde_json::to_value([&info])?);
        self.collection.update_one(&self.filter, &update, true).await?;
        debug!(
            api_id = self.identity.api_id,
            dc_id = ?info.dc_id,
            has_auth_key = info.auth_key.is_some(),
            "Stored connection info"
        );
        Ok(())
    }

    /// Append rows whose id is not stored yet.
    async fn persist_rows(&self, rows: &[EntityRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let stored = self.load_document().await?.unwrap_or_default();
        let mut entities: Vec<Value> = document::list(&stored, ENTITIES)?;
        let mut known: HashSet<i64> = document::entry_ids(&entities).into_iter().collect();
        let before = entities.len();
        for row in rows {
            if known.insert(row.id) {
                entities.push(serde_json::to_value(row)?);
            }
        }

        let added = entities.len() - before;
        if added == 0 {
            debug!(rows = rows.len(), "All entities already stored");
            return Ok(());
        }

        let update = Update::new().set(ENTITIES, Value::Array(entities));
        self.collection.update_one(&self.filter, &update, true).await?;
        debug!(added, "Stored entities");
        Ok(())
    }

    async fn stored_entities(&self) -> Result<Vec<EntityRow>> {
        match self.load_document().await? {
            Some(stored) => document::list(&stored, ENTITIES),
            None => Ok(Vec::new()),
        }
    }

    async fn find_entity(
        &self,
        predicate: impl Fn(&EntityRow) -> bool + Send,
    ) -> Result<Option<(i64, i64)>> {
        Ok(self
            .stored_entities()
            .await?
            .iter()
            .find(|row| predicate(row))
            .map(EntityRow::id_and_hash))
    }
}

#[async_trait]
impl Session for DocumentSession {
    fn dc_id(&self) -> Option<i32> {
        self.memory.dc_id()
    }

    fn server_address(&self) -> Option<&str> {
        self.memory.server_address()
    }

    fn port(&self) -> Option<u16> {
        self.memory.port()
    }

    async fn set_dc(&mut self, dc_id: i32, server_address: &str, port: u16) -> Result<()> {
        self.memory.set_dc(dc_id, server_address, port).await?;
        self.persist_connection_info().await
    }

    fn auth_key(&self) -> Option<&AuthKey> {
        self.memory.auth_key()
    }

    async fn set_auth_key(&mut self, key: Option<AuthKey>) -> Result<()> {
        self.memory.set_auth_key(key).await?;
        self.persist_connection_info().await
    }

    fn takeout_id(&self) -> Option<i64> {
        self.memory.takeout_id()
    }

    async fn set_takeout_id(&mut self, takeout_id: Option<i64>) -> Result<()> {
        self.memory.set_takeout_id(takeout_id).await?;
        self.persist_connection_info().await
    }

    async fn get_update_state(&self, entity_id: i64) -> Result<Option<UpdateState>> {
        let Some(stored) = self.load_document().await? else {
            return Ok(None);
        };
        let records: Vec<UpdateStateRecord> = document::list(&stored, UPDATE_STATES)?;
        records
            .iter()
            .find(|record| record.id == entity_id)
            .map(UpdateStateRecord::to_state)
            .transpose()
    }

    /// Store a cursor for an entity that has none yet.
    ///
    /// A stored cursor is never overwritten; only the in-memory copy changes.
    async fn set_update_state(&mut self, entity_id: i64, state: UpdateState) -> Result<()> {
        self.memory.set_update_state(entity_id, state.clone()).await?;

        let stored = self.load_document().await?.unwrap_or_default();
        let mut states: Vec<Value> = document::list(&stored, UPDATE_STATES)?;
        if document::entry_ids(&states).contains(&entity_id) {
            debug!(entity_id, "Update state already stored");
            return Ok(());
        }

        states.push(serde_json::to_value(UpdateStateRecord::from_state(
            entity_id, &state,
        ))?);
        let update = Update::new().set(UPDATE_STATES, Value::Array(states));
        self.collection.update_one(&self.filter, &update, true).await?;
        debug!(entity_id, pts = state.pts, "Stored update state");
        Ok(())
    }

    async fn get_update_states(&self) -> Result<Vec<(i64, UpdateState)>> {
        let Some(stored) = self.load_document().await? else {
            return Ok(Vec::new());
        };
        let records: Vec<UpdateStateRecord> = document::list(&stored, UPDATE_STATES)?;
        records
            .iter()
            .map(|record| Ok((record.id, record.to_state()?)))
            .collect()
    }

    fn save_entities(&self) -> bool {
        self.memory.save_entities()
    }

    fn set_save_entities(&mut self, save: bool) {
        self.memory.set_save_entities(save);
    }

    async fn process_entities(&mut self, peers: &[Peer]) -> Result<()> {
        if !self.save_entities() {
            return Ok(());
        }

        self.memory.process_entities(peers).await?;
        let rows: Vec<EntityRow> = peers.iter().filter_map(Peer::to_row).collect();
        self.persist_rows(&rows).await
    }

    async fn get_entity_rows_by_phone(&self, phone: &str) -> Result<Option<(i64, i64)>> {
        self.find_entity(|row| row.phone.as_deref() == Some(phone))
            .await
    }

    async fn get_entity_rows_by_username(&self, username: &str) -> Result<Option<(i64, i64)>> {
        self.find_entity(|row| row.username.as_deref() == Some(username))
            .await
    }

    async fn get_entity_rows_by_name(&self, name: &str) -> Result<Option<(i64, i64)>> {
        self.find_entity(|row| row.name.as_deref() == Some(name))
            .await
    }

    async fn get_entity_rows_by_id(&self, id: i64, exact: bool) -> Result<Option<(i64, i64)>> {
        if exact {
            self.find_entity(|row| row.id == id).await
        } else {
            let ids = marked_ids(id);
            self.find_entity(|row| ids.contains(&row.id)).await
        }
    }

    async fn get_file(
        &self,
        md5_digest: &[u8],
        file_size: i64,
        kind: SentFileType,
    ) -> Result<Option<InputFile>> {
        let Some(stored) = self.load_document().await? else {
            return Ok(None);
        };
        let records: Vec<SentFileRecord> = document::list(&stored, SENT_FILES)?;
        Ok(records
            .iter()
            .find_map(|record| record.handle_for(md5_digest, file_size, kind)))
    }

    /// Store a sent file unless its id is already stored.
    ///
    /// Only updates an existing document; nothing is inserted.
    async fn cache_file(
        &mut self,
        md5_digest: &[u8],
        file_size: i64,
        file: &InputFile,
    ) -> Result<()> {
        let kind = SentFileType::try_from(file)?;

        let stored = self.load_document().await?.unwrap_or_default();
        let mut files: Vec<Value> = document::list(&stored, SENT_FILES)?;
        if document::entry_ids(&files).contains(&file.id()) {
            debug!(file_id = file.id(), "Sent file already stored");
            return Ok(());
        }

        self.memory.cache_file(md5_digest, file_size, file).await?;
        files.push(serde_json::to_value(SentFileRecord::new(
            md5_digest, file_size, kind, file,
        ))?);
        let update = Update::new().set(SENT_FILES, Value::Array(files));
        let outcome = self.collection.update_one(&self.filter, &update, false).await?;
        debug!(
            file_id = file.id(),
            matched = outcome.matched,
            "Stored sent file"
        );
        Ok(())
    }

    /// Clear the stored connection info. The in-memory copy is kept.
    async fn delete(&mut self) -> Result<()> {
        let Some(stored) = self.load_document().await? else {
            return Ok(());
        };
        let sessions: Vec<Value> = document::list(&stored, SESSIONS)?;
        if sessions.is_empty() {
            return Ok(());
        }

        let update = Update::new().set(SESSIONS, Value::Array(Vec::new()));
        self.collection.update_one(&self.filter, &update, false).await?;
        info!(api_id = self.identity.api_id, "Deleted connection info");
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        if let Some(store) = self.collection.backend().as_any().downcast_ref::<InMemory>() {
            store.save_to_file(path).await?;
            debug!(path = %path.display(), "Saved in-memory store");
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.save().await
    }
}
