//! Session state and the consumer-facing `Session` trait.
//!
//! A messaging client talks to its session through [`Session`]: connection
//! parameters, the authorization key, cached peers, sent-file fingerprints
//! and update cursors. [`MemorySession`] keeps all of it in memory;
//! [`crate::store::DocumentSession`] persists it into a document store.

use async_trait::async_trait;

pub mod errors;
mod memory;
pub mod peer;
pub mod types;

pub use errors::SessionError;
pub use memory::MemorySession;
pub use peer::{Channel, Chat, Peer, PeerId, PeerKind, User};
pub use types::{AuthKey, EntityKey, EntityRow, InputFile, InputPeer, SentFileType, UpdateState};

use crate::Result;

/// Storage for the state a messaging client needs across restarts.
///
/// Getters for connection parameters read the in-memory copy. Operations
/// that may touch storage are async and return [`Result`].
#[async_trait]
pub trait Session: Send + Sync {
    /// Data center the session is bound to.
    fn dc_id(&self) -> Option<i32>;

    fn server_address(&self) -> Option<&str>;

    fn port(&self) -> Option<u16>;

    /// Bind the session to a data center.
    async fn set_dc(&mut self, dc_id: i32, server_address: &str, port: u16) -> Result<()>;

    fn auth_key(&self) -> Option<&AuthKey>;

    /// Replace the authorization key; `None` forgets it.
    async fn set_auth_key(&mut self, key: Option<AuthKey>) -> Result<()>;

    fn takeout_id(&self) -> Option<i64>;

    async fn set_takeout_id(&mut self, takeout_id: Option<i64>) -> Result<()>;

    /// Update cursor for an entity, `0` being the account-wide cursor.
    async fn get_update_state(&self, entity_id: i64) -> Result<Option<UpdateState>>;

    async fn set_update_state(&mut self, entity_id: i64, state: UpdateState) -> Result<()>;

    /// Every stored update cursor with its entity id.
    async fn get_update_states(&self) -> Result<Vec<(i64, UpdateState)>>;

    /// Whether peers seen by the client are recorded.
    fn save_entities(&self) -> bool;

    fn set_save_entities(&mut self, save: bool);

    /// Record the addressable peers among `peers`.
    async fn process_entities(&mut self, peers: &[Peer]) -> Result<()>;

    async fn get_entity_rows_by_phone(&self, phone: &str) -> Result<Option<(i64, i64)>>;

    async fn get_entity_rows_by_username(&self, username: &str) -> Result<Option<(i64, i64)>>;

    async fn get_entity_rows_by_name(&self, name: &str) -> Result<Option<(i64, i64)>>;

    /// Find a cached peer by id.
    ///
    /// With `exact` unset, `id` is treated as a raw id and matches the user,
    /// chat and channel encodings alike.
    async fn get_entity_rows_by_id(&self, id: i64, exact: bool) -> Result<Option<(i64, i64)>>;

    /// Resolve a key to a request-ready peer.
    ///
    /// Phone numbers use the phone lookup and usernames or `t.me` links the
    /// username lookup. Any text that still has no match is tried as a
    /// display name. Ids match every peer encoding.
    async fn get_input_entity(&self, key: EntityKey) -> Result<Option<InputPeer>> {
        let found = match key {
            EntityKey::Id(id) => self.get_entity_rows_by_id(id, false).await?,
            EntityKey::Text(text) => {
                let found = if let Some(phone) = peer::parse_phone(&text) {
                    self.get_entity_rows_by_phone(&phone).await?
                } else if let Some(username) = peer::parse_username(&text) {
                    self.get_entity_rows_by_username(&username).await?
                } else {
                    None
                };
                match found {
                    Some(found) => Some(found),
                    None => self.get_entity_rows_by_name(&text).await?,
                }
            }
        };
        Ok(found.map(|(id, hash)| peer::input_peer(id, hash)))
    }

    /// Look up a previously sent file by content digest, size and type.
    async fn get_file(
        &self,
        md5_digest: &[u8],
        file_size: i64,
        kind: SentFileType,
    ) -> Result<Option<InputFile>>;

    /// Remember a sent file.
    ///
    /// Fails with a type error unless `file` is a photo or document handle.
    async fn cache_file(
        &mut self,
        md5_digest: &[u8],
        file_size: i64,
        file: &InputFile,
    ) -> Result<()>;

    /// Forget the connection info.
    async fn delete(&mut self) -> Result<()>;

    async fn save(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Copy the data center binding and the `save_entities` flag into `target`.
    async fn clone_to(&self, target: &mut dyn Session) -> Result<()> {
        if let (Some(dc_id), Some(server_address), Some(port)) =
            (self.dc_id(), self.server_address(), self.port())
        {
            target.set_dc(dc_id, server_address, port).await?;
        }
        target.set_save_entities(self.save_entities());
        Ok(())
    }
}
