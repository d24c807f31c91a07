use chrono::{TimeZone, Utc};
use multisession::{
    DocumentSession, Session, SessionIdentity,
    constants::DEFAULT_DATABASE,
    session::{AuthKey, MemorySession, UpdateState},
    store::CollectionRef,
};

use crate::helpers::{
    channel, default_collection, open_session, test_backend, test_identity, user,
};

async fn populated_memory_session() -> MemorySession {
    let mut memory = MemorySession::new();
    memory.set_dc(2, "149.154.167.40", 80).await.unwrap();
    memory
        .set_auth_key(AuthKey::new(vec![3u8; 256]))
        .await
        .unwrap();
    memory
        .process_entities(&[user(10, 100, "alice", "1"), channel(30, 300, "news")])
        .await
        .unwrap();
    let date = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    memory
        .set_update_state(0, UpdateState::new(11, 12, date, 13))
        .await
        .unwrap();
    memory
}

#[tokio::test]
async fn test_import_without_key_or_states() {
    let backend = test_backend().await;
    let mut session = open_session(&backend).await;
    let memory = populated_memory_session().await;

    session.import_from(&memory, false, false).await.unwrap();

    assert_eq!(session.dc_id(), Some(2));
    assert!(session.auth_key().is_none());
    assert_eq!(session.memory().entity_rows().len(), 2);
    assert_eq!(
        session.get_entity_rows_by_username("news").await.unwrap(),
        Some((-1_000_000_000_030, 300))
    );
    assert!(session.get_update_state(0).await.unwrap().is_none());

    let reopened = open_session(&backend).await;
    assert_eq!(reopened.port(), Some(80));
    assert!(reopened.auth_key().is_none());
}

#[tokio::test]
async fn test_import_with_key_and_states() {
    let backend = test_backend().await;
    let mut session = open_session(&backend).await;
    let memory = populated_memory_session().await;

    session.import_from(&memory, true, true).await.unwrap();

    let state = session.get_update_state(0).await.unwrap().unwrap();
    assert_eq!((state.pts, state.qts, state.seq), (11, 12, 13));

    let reopened = open_session(&backend).await;
    assert_eq!(reopened.auth_key().map(|key| key.as_bytes()[0]), Some(3));
}

#[tokio::test]
async fn test_import_respects_save_entities() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    session.set_save_entities(false);
    let memory = populated_memory_session().await;

    session.import_from(&memory, false, false).await.unwrap();

    // Adopted in memory only.
    assert_eq!(session.memory().entity_rows().len(), 2);
    let stored = collection
        .find_one(&test_identity().filter())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["entities"], serde_json::json!([]));
}

#[tokio::test]
async fn test_import_from_another_document_session() {
    let backend = test_backend().await;
    let mut source = open_session(&backend).await;
    source.set_dc(5, "91.108.56.130", 443).await.unwrap();

    let mut target = DocumentSession::open_with_backend(
        SessionIdentity::new(1, "other", "15550000"),
        backend.clone(),
        DEFAULT_DATABASE,
        CollectionRef::Default,
    )
    .await
    .unwrap();
    assert_eq!(target.dc_id(), None);
    target
        .import_from(source.memory(), false, false)
        .await
        .unwrap();
    assert_eq!(target.dc_id(), Some(5));
}

#[tokio::test]
async fn test_clone_to_memory() {
    let backend = test_backend().await;
    let mut session = open_session(&backend).await;
    session.set_dc(4, "149.154.167.91", 443).await.unwrap();
    session
        .set_auth_key(AuthKey::new(vec![1u8; 256]))
        .await
        .unwrap();
    session.set_save_entities(false);

    let cloned = session.clone_to_memory().await.unwrap();
    assert_eq!(cloned.dc_id(), Some(4));
    assert_eq!(cloned.server_address(), Some("149.154.167.91"));
    assert_eq!(cloned.port(), Some(443));
    assert!(!cloned.save_entities());
    assert!(cloned.auth_key().is_none());
}
