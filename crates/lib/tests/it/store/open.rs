use std::sync::Arc;

use multisession::{
    DocumentSession, Session, SessionIdentity,
    backend::{BackendImpl, Collection, Document, ID_FIELD, Update, database::InMemory},
    constants::DEFAULT_DATABASE,
    session::AuthKey,
    store::{CollectionRef, SessionDocument},
};
use serde_json::{Value, json};

use crate::helpers::{default_collection, open_session, test_backend, test_identity};

/// The stored document without its generated `_id`.
async fn stored_without_id(collection: &Collection, session: &DocumentSession) -> Value {
    let mut stored = collection
        .find_one(session.session_filter())
        .await
        .unwrap()
        .expect("document should exist");
    assert!(stored.remove(ID_FIELD).is_some());
    Value::Object(stored)
}

#[tokio::test]
async fn test_open_creates_empty_document() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let session = open_session(&backend).await;

    assert_eq!(
        stored_without_id(&collection, &session).await,
        json!({
            "api_id": 611335,
            "api_hash": "hash",
            "phone": "9996621234",
            "sessions": [],
            "entities": [],
            "sent_files": [],
            "update_states": [],
            "versions": [{"version": 1}]
        })
    );
    assert_eq!(session.dc_id(), None);
    assert!(session.auth_key().is_none());
}

#[tokio::test]
async fn test_set_dc_writes_single_connection_info() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut session = open_session(&backend).await;

    session.set_dc(2, "149.154.167.40", 80).await.unwrap();

    let stored = stored_without_id(&collection, &session).await;
    assert_eq!(
        stored["sessions"],
        json!([{
            "dc_id": 2,
            "server_address": "149.154.167.40",
            "port": 80,
            "auth_key": null,
            "takeout_id": null
        }])
    );

    session.set_dc(4, "149.154.167.91", 443).await.unwrap();
    let stored = stored_without_id(&collection, &session).await;
    assert_eq!(stored["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(stored["sessions"][0]["dc_id"], json!(4));
}

#[tokio::test]
async fn test_reopen_restores_connection_info() {
    let backend = test_backend().await;
    let key = vec![0x5A; 256];
    {
        let mut session = open_session(&backend).await;
        session.set_dc(2, "149.154.167.40", 80).await.unwrap();
        session
            .set_auth_key(AuthKey::new(key.clone()))
            .await
            .unwrap();
        session.set_takeout_id(Some(12)).await.unwrap();
    }

    let session = open_session(&backend).await;
    assert_eq!(session.dc_id(), Some(2));
    assert_eq!(session.server_address(), Some("149.154.167.40"));
    assert_eq!(session.port(), Some(80));
    assert_eq!(session.auth_key().map(|k| k.as_bytes().to_vec()), Some(key));
    assert_eq!(session.takeout_id(), Some(12));
}

#[tokio::test]
async fn test_reopen_keeps_newest_connection_info() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let identity = test_identity();
    collection
        .update_one(
            &identity.filter(),
            &Update::new().set(
                "sessions",
                json!([
                    {"dc_id": 1, "server_address": "149.154.175.53", "port": 443},
                    {"dc_id": 5, "server_address": "91.108.56.130", "port": 443}
                ]),
            ),
            true,
        )
        .await
        .unwrap();

    let session = open_session(&backend).await;
    assert_eq!(session.dc_id(), Some(5));

    let stored = stored_without_id(&collection, &session).await;
    assert_eq!(stored["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(stored["sessions"][0]["dc_id"], json!(5));
}

#[tokio::test]
async fn test_reopen_rewrites_version_and_fills_lists() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let identity = test_identity();
    collection
        .update_one(
            &identity.filter(),
            &Update::new()
                .set("versions", json!([{"version": 0}]))
                .set("entities", json!([{"id": 10, "hash": 1, "username": "kept"}])),
            true,
        )
        .await
        .unwrap();

    let session = open_session(&backend).await;
    let stored = stored_without_id(&collection, &session).await;
    assert_eq!(stored["versions"], json!([{"version": 1}]));
    assert_eq!(stored["sessions"], json!([]));
    assert_eq!(stored["sent_files"], json!([]));
    assert_eq!(stored["update_states"], json!([]));
    assert_eq!(stored["entities"][0]["username"], json!("kept"));

    // Stored entities are loaded into memory.
    assert_eq!(session.memory().entity_rows().len(), 1);
}

#[tokio::test]
async fn test_reopen_does_not_create_duplicates() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    open_session(&backend).await;
    open_session(&backend).await;

    assert_eq!(collection.count(&Document::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_identities_are_separate_documents() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    let mut first = open_session(&backend).await;
    first.set_dc(2, "149.154.167.40", 80).await.unwrap();

    let other = SessionIdentity::new(611335, "hash", "9996620000");
    let second = DocumentSession::open_with_backend(
        other.clone(),
        backend.clone(),
        DEFAULT_DATABASE,
        CollectionRef::Default,
    )
    .await
    .unwrap();

    assert_eq!(second.dc_id(), None);
    assert_eq!(second.session_filter(), &other.filter());
    assert_eq!(collection.count(&Document::new()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_open_with_collection_handle() {
    let backend: Arc<dyn BackendImpl> = Arc::new(InMemory::new());
    let handle = Collection::new(backend.clone(), "elsewhere", "accounts").unwrap();

    let session = DocumentSession::open_with_backend(
        test_identity(),
        backend.clone(),
        DEFAULT_DATABASE,
        handle.clone(),
    )
    .await
    .unwrap();

    assert_eq!(session.collection().namespace().to_string(), "elsewhere.accounts");
    assert!(handle.find_one(session.session_filter()).await.unwrap().is_some());
    assert!(
        default_collection(&backend)
            .find_one(session.session_filter())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_open_rejects_invalid_collection() {
    let backend = test_backend().await;
    for name in ["", "bad$name", "system.sessions"] {
        let err = DocumentSession::open_with_backend(
            test_identity(),
            backend.clone(),
            DEFAULT_DATABASE,
            name,
        )
        .await
        .unwrap_err();
        assert!(err.is_config_error(), "{name:?} should be rejected");
    }

    let err = DocumentSession::open_with_backend(
        test_identity(),
        backend.clone(),
        "bad.db",
        CollectionRef::Default,
    )
    .await
    .unwrap_err();
    assert!(err.is_config_error());
}

#[tokio::test]
async fn test_open_fails_on_malformed_document() {
    let backend = test_backend().await;
    let collection = default_collection(&backend);
    collection
        .update_one(
            &test_identity().filter(),
            &Update::new().set("sessions", json!("not a list")),
            true,
        )
        .await
        .unwrap();

    let err = DocumentSession::open_with_backend(
        test_identity(),
        backend.clone(),
        DEFAULT_DATABASE,
        CollectionRef::Default,
    )
    .await
    .unwrap_err();
    assert!(err.is_integrity_error());
    assert_eq!(err.module(), "store");
}

#[tokio::test]
async fn test_load_document_parses() {
    let backend = test_backend().await;
    let mut session = open_session(&backend).await;
    session.set_dc(2, "149.154.167.40", 80).await.unwrap();

    let raw = session.load_document().await.unwrap().unwrap();
    let parsed = SessionDocument::from_document(&raw).unwrap();
    assert_eq!(parsed.version(), Some(1));
    assert_eq!(parsed.connection_info().and_then(|info| info.dc_id), Some(2));
}
