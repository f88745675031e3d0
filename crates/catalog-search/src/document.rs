//! Mapping between index documents and Tantivy documents.

use serde_json::{Map, Value as JsonValue};
use tantivy::{Document, TantivyDocument};

use catalog_types::{FieldValue, IndexDocument, ID_FIELD, ITEM_ID_FIELD, NAMESPACE_FIELD};

use crate::error::SearchError;
use crate::schema::{CatalogSchema, DYNAMIC_FIELDS};

/// Convert an IndexDocument to a Tantivy document.
///
/// The identity fields are copied into their typed columns; the whole
/// document, identity included, is stored under the JSON field.
pub fn to_tantivy_doc(schema: &CatalogSchema, document: &IndexDocument) -> Result<TantivyDocument, SearchError> {
    let doc_id = document
        .id()
        .ok_or_else(|| SearchError::InvalidDocument(format!("missing {} field", ID_FIELD)))?;
    let namespace = document
        .get_first(NAMESPACE_FIELD)
        .and_then(FieldValue::as_str)
        .ok_or_else(|| SearchError::InvalidDocument(format!("missing {} field", NAMESPACE_FIELD)))?;
    let item_id = document
        .get_first(ITEM_ID_FIELD)
        .and_then(FieldValue::as_i64)
        .ok_or_else(|| SearchError::InvalidDocument(format!("missing {} field", ITEM_ID_FIELD)))?;

    let mut json = Map::new();
    json.insert(NAMESPACE_FIELD.to_string(), JsonValue::from(namespace));
    json.insert(ID_FIELD.to_string(), JsonValue::from(doc_id));
    json.insert(ITEM_ID_FIELD.to_string(), JsonValue::from(item_id));
    json.insert(DYNAMIC_FIELDS.to_string(), serde_json::to_value(document)?);

    let text = serde_json::to_string(&JsonValue::Object(json))?;
    TantivyDocument::parse_json(schema.schema(), &text)
        .map_err(|e| SearchError::InvalidDocument(e.to_string()))
}

/// Rebuild an IndexDocument from a stored Tantivy document.
pub fn from_tantivy_doc(schema: &CatalogSchema, doc: &TantivyDocument) -> Result<IndexDocument, SearchError> {
    let stored: JsonValue = serde_json::from_str(&doc.to_json(schema.schema()))?;

    // Stored values come back as arrays, one entry per value added
    let fields = match stored.get(DYNAMIC_FIELDS) {
        Some(JsonValue::Array(objects)) => objects.first().cloned(),
        Some(other) => Some(other.clone()),
        None => None,
    };
    let Some(JsonValue::Object(fields)) = fields else {
        return Err(SearchError::InvalidDocument(format!(
            "stored document has no {} object",
            DYNAMIC_FIELDS
        )));
    };

    let mut document = IndexDocument::new();
    for (name, value) in fields {
        let values = match value {
            JsonValue::Array(items) => items,
            single => vec![single],
        };
        for item in values {
            document.add_field(name.clone(), serde_json::from_value::<FieldValue>(item)?);
        }
    }
    Ok(document)
}
