use chrono::{TimeZone, Utc};
use multisession::{
    Session,
    backend::{Collection, Update},
    session::{
        EntityKey, InputFile, InputPeer, SentFileType, UpdateState, peer::CHANNEL_MARK,
    },
};
use serde_json::{Value, json};

use crate::helpers::{
    channel, chat, default_collection, open_session, test_backend, test_identity, user,
};

async fn stored_list(collection: &Collection, field: &str) -> Vec<Value> {
    let stored = collection
        .find_one(&test_identity().filter())
        .await
        .unwrap()
        .expect("document should exist");
    stored
        .get(field)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn test_process_entities_is_idempotent() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    let peers = [user(10, 100, "alice", "15550010"), chat(20, "Book Club")];

    session.process_entities(&peers).await.unwrap();
    session.process_entities(&peers).await.unwrap();

    let entities = stored_list(&collection, "entities").await;
    assert_eq!(entities.len(), 2);
    assert_eq!(
        entities[0],
        json!({
            "id": 10,
            "hash": 100,
            "username": "alice",
            "phone": "15550010",
            "name": "Test User10"
        })
    );
}

#[tokio::test]
async fn test_stored_entity_is_never_overwritten() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;

    session
        .process_entities(&[user(10, 100, "before", "1")])
        .await
        .unwrap();
    session
        .process_entities(&[user(10, 999, "after", "1"), channel(30, 300, "news")])
        .await
        .unwrap();

    let entities = stored_list(&collection, "entities").await;
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["hash"], json!(100));
    assert_eq!(
        session.get_entity_rows_by_username("before").await.unwrap(),
        Some((10, 100))
    );
    assert_eq!(session.get_entity_rows_by_username("after").await.unwrap(), None);
}

#[tokio::test]
async fn test_duplicates_within_one_batch_are_stored_once() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;

    session
        .process_entities(&[user(10, 1, "first", "1"), user(10, 2, "second", "1")])
        .await
        .unwrap();

    let entities = stored_list(&collection, "entities").await;
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["username"], json!("first"));
}

#[tokio::test]
async fn test_save_entities_disabled_writes_nothing() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    session.set_save_entities(false);

    session
        .process_entities(&[user(10, 100, "alice", "1")])
        .await
        .unwrap();

    assert!(stored_list(&collection, "entities").await.is_empty());
    assert!(session.memory().entity_rows().is_empty());
}

#[tokio::test]
async fn test_lookup_by_id_non_exact_matches_any_encoding() {
    let backend = test_backend().await;
    let mut session = open_session(&backend).await;
    session
        .process_entities(&[
            user(7, 70, "u", "1"),
            chat(8, "c"),
            channel(9, 90, "ch"),
        ])
        .await
        .unwrap();

    assert_eq!(session.get_entity_rows_by_id(7, false).await.unwrap(), Some((7, 70)));
    assert_eq!(session.get_entity_rows_by_id(8, false).await.unwrap(), Some((-8, 0)));
    assert_eq!(
        session.get_entity_rows_by_id(9, false).await.unwrap(),
        Some((-1_000_000_000_009, 90))
    );
    assert_eq!(session.get_entity_rows_by_id(8, true).await.unwrap(), None);
    assert_eq!(session.get_entity_rows_by_id(-8, true).await.unwrap(), Some((-8, 0)));
}

#[tokio::test]
async fn test_lookup_by_extreme_id_returns_absent() {
    let backend = test_backend().await;
    let session = open_session(&backend).await;

    assert_eq!(session.get_entity_rows_by_id(i64::MAX, false).await.unwrap(), None);
    assert_eq!(
        session.get_input_entity(EntityKey::Id(i64::MIN)).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_stored_extreme_id_resolves_to_input_peer() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let session = open_session(&backend).await;
    collection
        .update_one(
            &test_identity().filter(),
            &Update::new().set("entities", json!([{"id": i64::MIN, "hash": 4}])),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        session.get_input_entity(EntityKey::Id(i64::MIN)).await.unwrap(),
        Some(InputPeer::Channel {
            channel_id: i64::MAX - CHANNEL_MARK + 1,
            access_hash: 4
        })
    );
}

#[tokio::test]
async fn test_existing_update_state_is_not_replaced() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    let date = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    session
        .set_update_state(0, UpdateState::new(1, 2, date, 3))
        .await
        .unwrap();
    session
        .set_update_state(0, UpdateState::new(100, 200, date, 300))
        .await
        .unwrap();

    let states = stored_list(&collection, "update_states").await;
    assert_eq!(
        states,
        vec![json!({"id": 0, "pts": 1, "qts": 2, "date": 1_700_000_000, "seq": 3})]
    );

    let stored = session.get_update_state(0).await.unwrap().unwrap();
    assert_eq!(stored.pts, 1);
    assert_eq!(stored.date, date);
}

#[tokio::test]
async fn test_update_state_with_missing_fields_reads_defaults() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let session = open_session(&backend).await;
    collection
        .update_one(
            &test_identity().filter(),
            &Update::new().set("update_states", json!([{"id": 3, "pts": 9}])),
            false,
        )
        .await
        .unwrap();

    let state = session.get_update_state(3).await.unwrap().unwrap();
    assert_eq!(state.pts, 9);
    assert_eq!(state.qts, 0);
    assert_eq!(state.date.timestamp(), 0);
}

#[tokio::test]
async fn test_cache_file_stores_one_entry_per_id() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    let photo = InputFile::Photo {
        id: 50,
        access_hash: 500,
    };

    session.cache_file(b"\x01\x02", 2048, &photo).await.unwrap();
    session.cache_file(b"\x01\x02", 2048, &photo).await.unwrap();
    session.cache_file(b"\x03", 10, &photo).await.unwrap();

    let files = stored_list(&collection, "sent_files").await;
    assert_eq!(
        files,
        vec![json!({
            "id": 50,
            "md5_digest": "AQI=",
            "file_size": 2048,
            "type": 1,
            "hash": 500
        })]
    );
    assert_eq!(
        session
            .get_file(b"\x01\x02", 2048, SentFileType::Photo)
            .await
            .unwrap(),
        Some(photo)
    );
}

#[tokio::test]
async fn test_cache_file_rejects_uploads_without_writing() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    let upload = InputFile::UploadedBig {
        id: 51,
        parts: 100,
        name: "video.mp4".to_string(),
    };

    let err = session.cache_file(b"md5", 1, &upload).await.unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(err.module(), "session");
    assert!(stored_list(&collection, "sent_files").await.is_empty());
}

#[tokio::test]
async fn test_delete_clears_connection_info() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;
    session.set_dc(2, "149.154.167.40", 80).await.unwrap();

    session.delete().await.unwrap();

    assert!(stored_list(&collection, "sessions").await.is_empty());
    // The in-memory copy survives until the next open.
    assert_eq!(session.dc_id(), Some(2));

    let reopened = open_session(&backend).await;
    assert_eq!(reopened.dc_id(), None);
}

#[tokio::test]
async fn test_delete_without_connection_info_is_a_no_op() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;

    session.delete().await.unwrap();
    session.delete().await.unwrap();
    assert!(stored_list(&collection, "sessions").await.is_empty());
}
