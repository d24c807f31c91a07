use multisession::backend::{Document, ID_FIELD, Namespace, Update};
use serde_json::{Value, json};

use crate::helpers::test_backend;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn namespace() -> Namespace {
    Namespace::new("multisession", "telegram").unwrap()
}

#[tokio::test]
async fn test_find_one_on_empty_collection() {
    let backend = test_backend().await;
    let found = backend
        .find_one(&namespace(), &doc(json!({"api_id": 1})))
        .await
        .unwrap();
    assert!(found.is_none());
    assert_eq!(backend.count(&namespace(), &Document::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_upsert_inserts_filter_and_set_fields() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 1, "phone": "555"}));
    let update = Update::new().set("sessions", json!([]));

    let outcome = backend
        .update_one(&namespace(), &filter, &update, true)
        .await
        .unwrap();
    assert_eq!(outcome.matched, 0);
    let id = outcome.upserted_id.expect("upsert should insert");

    let stored = backend.find_one(&namespace(), &filter).await.unwrap().unwrap();
    assert_eq!(stored.get(ID_FIELD), Some(&json!(id)));
    assert_eq!(stored.get("api_id"), Some(&json!(1)));
    assert_eq!(stored.get("phone"), Some(&json!("555")));
    assert_eq!(stored.get("sessions"), Some(&json!([])));
}

#[tokio::test]
async fn test_update_without_upsert_matches_nothing() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 2}));
    let update = Update::new().set("sent_files", json!([1]));

    let outcome = backend
        .update_one(&namespace(), &filter, &update, false)
        .await
        .unwrap();
    assert_eq!(outcome.matched, 0);
    assert!(outcome.upserted_id.is_none());
    assert!(backend.find_one(&namespace(), &filter).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_keeps_other_fields() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 3}));
    backend
        .update_one(
            &namespace(),
            &filter,
            &Update::new()
                .set("entities", json!([{"id": 1}]))
                .set("versions", json!([{"version": 1}])),
            true,
        )
        .await
        .unwrap();

    let outcome = backend
        .update_one(
            &namespace(),
            &filter,
            &Update::new().set("entities", json!([{"id": 1}, {"id": 2}])),
            true,
        )
        .await
        .unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.modified, 1);

    let stored = backend.find_one(&namespace(), &filter).await.unwrap().unwrap();
    assert_eq!(stored["entities"], json!([{"id": 1}, {"id": 2}]));
    assert_eq!(stored["versions"], json!([{"version": 1}]));
    assert_eq!(backend.count(&namespace(), &Document::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unchanged_set_is_not_modified() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 4}));
    let update = Update::new().set("sessions", json!([]));
    backend
        .update_one(&namespace(), &filter, &update, true)
        .await
        .unwrap();

    let outcome = backend
        .update_one(&namespace(), &filter, &update, true)
        .await
        .unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.modified, 0);
}

#[tokio::test]
async fn test_filter_matches_every_field() {
    let backend = test_backend().await;
    for phone in ["111", "222"] {
        backend
            .update_one(
                &namespace(),
                &doc(json!({"api_id": 5, "api_hash": "h", "phone": phone})),
                &Update::new().set("sessions", json!([])),
                true,
            )
            .await
            .unwrap();
    }

    let all = backend
        .find(&namespace(), &doc(json!({"api_id": 5})))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["phone"], json!("111"));

    let one = backend
        .find(&namespace(), &doc(json!({"api_id": 5, "phone": "222"})))
        .await
        .unwrap();
    assert_eq!(one.len(), 1);

    let none = backend
        .find(&namespace(), &doc(json!({"api_id": 5, "api_hash": "other"})))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let backend = test_backend().await;
    let other = Namespace::new("multisession", "accounts").unwrap();
    let filter = doc(json!({"api_id": 6}));
    backend
        .update_one(&namespace(), &filter, &Update::new().set("a", json!(1)), true)
        .await
        .unwrap();

    assert!(backend.find_one(&other, &filter).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_update_is_rejected() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 7}));

    let err = backend
        .update_one(&namespace(), &filter, &Update::new().set("$push", json!({})), true)
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
    assert!(backend.find_one(&namespace(), &filter).await.unwrap().is_none());
}

#[tokio::test]
async fn test_id_is_immutable() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 8}));
    backend
        .update_one(&namespace(), &filter, &Update::new().set("a", json!(1)), true)
        .await
        .unwrap();

    let err = backend
        .update_one(
            &namespace(),
            &filter,
            &Update::new().set(ID_FIELD, json!("replaced")),
            false,
        )
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn test_drop_database() {
    let backend = test_backend().await;
    let filter = doc(json!({"api_id": 9}));
    let kept = Namespace::new("other", "telegram").unwrap();
    for ns in [&namespace(), &kept] {
        backend
            .update_one(ns, &filter, &Update::new().set("a", json!(1)), true)
            .await
            .unwrap();
    }

    backend.drop_database("multisession").await.unwrap();
    assert!(backend.find_one(&namespace(), &filter).await.unwrap().is_none());
    assert!(backend.find_one(&kept, &filter).await.unwrap().is_some());
}
