//! Filter matching and `$set` application shared by all backends.

use serde_json::Value;

use super::{BackendError, Document, ID_FIELD, Update};
use crate::Result;

/// Check whether every field of `filter` is present in `document` with an equal value.
pub(crate) fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// Apply a validated `$set` update in place.
///
/// Returns whether the document content changed.
pub(crate) fn apply_update(document: &mut Document, update: &Update) -> Result<bool> {
    update.validate()?;

    if let Some(new_id) = update.fields().get(ID_FIELD)
        && document.get(ID_FIELD) != Some(new_id)
    {
        return Err(BackendError::ImmutableField {
            field: ID_FIELD.to_string(),
        }
        .into());
    }

    let mut modified = false;
    for (field, value) in update.fields() {
        if document.get(field) != Some(value) {
            document.insert(field.clone(), value.clone());
            modified = true;
        }
    }
    Ok(modified)
}

/// Build the document inserted by an upsert that matched nothing.
///
/// The filter fields come first, then the updated fields. The `_id` is taken
/// from the update if it names one, otherwise a fresh one is generated.
pub(crate) fn upsert_document(filter: &Document, update: &Update) -> Result<Document> {
    update.validate()?;

    let mut document = Document::new();
    let id = match update.fields().get(ID_FIELD) {
        Some(id) => id.clone(),
        None => Value::String(uuid::Uuid::new_v4().to_string()),
    };
    document.insert(ID_FIELD.to_string(), id);
    for (field, value) in filter {
        document.insert(field.clone(), value.clone());
    }
    for (field, value) in update.fields() {
        document.insert(field.clone(), value.clone());
    }
    Ok(document)
}

/// Read the `_id` of a stored document as a string.
pub(crate) fn document_id(document: &Document) -> Option<String> {
    match document.get(ID_FIELD)? {
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}
