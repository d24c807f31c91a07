//! In-memory session state.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use super::Session;
use super::peer::{Peer, marked_ids};
use super::types::{AuthKey, EntityRow, InputFile, SentFileType, UpdateState};
use crate::Result;

/// Key of a cached sent file: content digest, byte size and handle type.
type FileKey = (Vec<u8>, i64, SentFileType);

/// A session that keeps everything in process memory.
///
/// Nothing survives a restart. [`crate::store::DocumentSession`] embeds one
/// to mirror the persisted connection info and entity rows, and
/// [`crate::store::DocumentSession::import_from`] adopts the state of one.
#[derive(Debug, Clone)]
pub struct MemorySession {
    dc_id: Option<i32>,
    server_address: Option<String>,
    port: Option<u16>,
    auth_key: Option<AuthKey>,
    takeout_id: Option<i64>,
    save_entities: bool,
    entities: Vec<EntityRow>,
    files: HashMap<FileKey, (i64, i64)>,
    update_states: BTreeMap<i64, UpdateState>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self {
            dc_id: None,
            server_address: None,
            port: None,
            auth_key: None,
            takeout_id: None,
            save_entities: true,
            entities: Vec::new(),
            files: HashMap::new(),
            update_states: BTreeMap::new(),
        }
    }
}

impl MemorySession {
    /// Create an empty session that records entities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entity rows in insertion order.
    pub fn entity_rows(&self) -> &[EntityRow] {
        &self.entities
    }

    /// Update states ordered by entity id.
    pub fn update_states(&self) -> impl Iterator<Item = (i64, &UpdateState)> {
        self.update_states.iter().map(|(id, state)| (*id, state))
    }

    /// Number of cached sent files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Assign connection parameters, including absent ones.
    pub(crate) fn assign_dc(
        &mut self,
        dc_id: Option<i32>,
        server_address: Option<String>,
        port: Option<u16>,
    ) {
        self.dc_id = dc_id;
        self.server_address = server_address;
        self.port = port;
    }

    pub(crate) fn assign_auth_key(&mut self, key: Option<AuthKey>) {
        self.auth_key = key;
    }

    pub(crate) fn assign_takeout_id(&mut self, takeout_id: Option<i64>) {
        self.takeout_id = takeout_id;
    }

    /// Replace the whole entity cache.
    pub(crate) fn replace_entities(&mut self, rows: Vec<EntityRow>) {
        self.entities = rows;
    }

    /// Insert rows, replacing any cached row with the same id.
    pub(crate) fn record_rows(&mut self, rows: impl IntoIterator<Item = EntityRow>) {
        for row in rows {
            match self.entities.iter_mut().find(|cached| cached.id == row.id) {
                Some(cached) => *cached = row,
                None => self.entities.push(row),
            }
        }
    }

    fn find_entity(&self, predicate: impl Fn(&EntityRow) -> bool) -> Option<(i64, i64)> {
        self.entities
            .iter()
            .find(|row| predicate(row))
            .map(EntityRow::id_and_hash)
    }
}

#[async_trait]
impl Session for MemorySession {
    fn dc_id(&self) -> Option<i32> {
        self.dc_id
    }

    fn server_address(&self) -> Option<&str> {
        self.server_address.as_deref()
    }

    fn port(&self) -> Option<u16> {
        self.port
    }

    async fn set_dc(&mut self, dc_id: i32, server_address: &str, port: u16) -> Result<()> {
        self.assign_dc(Some(dc_id), Some(server_address.to_string()), Some(port));
        Ok(())
    }

    fn auth_key(&self) -> Option<&AuthKey> {
        self.auth_key.as_ref()
    }

    async fn set_auth_key(&mut self, key: Option<AuthKey>) -> Result<()> {
        self.assign_auth_key(key);
        Ok(())
    }

    fn takeout_id(&self) -> Option<i64> {
        self.takeout_id
    }

    async fn set_takeout_id(&mut self, takeout_id: Option<i64>) -> Result<()> {
        self.assign_takeout_id(takeout_id);
        Ok(())
    }

    async fn get_update_state(&self, entity_id: i64) -> Result<Option<UpdateState>> {
        Ok(self.update_states.get(&entity_id).cloned())
    }

    async fn set_update_state(&mut self, entity_id: i64, state: UpdateState) -> Result<()> {
        self.update_states.insert(entity_id, state);
        Ok(())
    }

    async fn get_update_states(&self) -> Result<Vec<(i64, UpdateState)>> {
        Ok(self
            .update_states
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect())
    }

    fn save_entities(&self) -> bool {
        self.save_entities
    }

    fn set_save_entities(&mut self, save: bool) {
        self.save_entities = save;
    }

    async fn process_entities(&mut self, peers: &[Peer]) -> Result<()> {
        self.record_rows(peers.iter().filter_map(Peer::to_row));
        Ok(())
    }

    async fn get_entity_rows_by_phone(&self, phone: &str) -> Result<Option<(i64, i64)>> {
        Ok(self.find_entity(|row| row.phone.as_deref() == Some(phone)))
    }

    async fn get_entity_rows_by_username(&self, username: &str) -> Result<Option<(i64, i64)>> {
        Ok(self.find_entity(|row| row.username.as_deref() == Some(username)))
    }

    async fn get_entity_rows_by_name(&self, name: &str) -> Result<Option<(i64, i64)>> {
        Ok(self.find_entity(|row| row.name.as_deref() == Some(name)))
    }

    async fn get_entity_rows_by_id(&self, id: i64, exact: bool) -> Result<Option<(i64, i64)>> {
        if exact {
            Ok(self.find_entity(|row| row.id == id))
        } else {
            let ids = marked_ids(id);
            Ok(self.find_entity(|row| ids.contains(&row.id)))
        }
    }

    async fn get_file(
        &self,
        md5_digest: &[u8],
        file_size: i64,
        kind: SentFileType,
    ) -> Result<Option<InputFile>> {
        Ok(self
            .files
            .get(&(md5_digest.to_vec(), file_size, kind))
            .map(|(id, hash)| InputFile::from_sent(kind, *id, *hash)))
    }

    async fn cache_file(
        &mut self,
        md5_digest: &[u8],
        file_size: i64,
        file: &InputFile,
    ) -> Result<()> {
        let kind = SentFileType::try_from(file)?;
        let access_hash = file.access_hash().unwrap_or_default();
        self.files
            .insert((md5_digest.to_vec(), file_size, kind), (file.id(), access_hash));
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        Ok(())
    }
}
