//! Tantivy schema for catalog index generations.
//!
//! Identity fields are typed columns; every generated field (categories,
//! per-locale values, facets) lives under one JSON field so that the dynamic
//! naming scheme needs no schema changes.

use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

use catalog_types::{ID_FIELD, ITEM_ID_FIELD, NAMESPACE_FIELD};

use crate::SearchError;

/// Name of the JSON field holding generated fields.
pub const DYNAMIC_FIELDS: &str = "fields";

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct CatalogSchema {
    schema: Schema,
    /// Tenant namespace (STRING | STORED)
    pub namespace: Field,
    /// Unique document id: `<namespace>_<item id>` (STRING | STORED)
    pub doc_id: Field,
    /// Raw catalog item id (i64, INDEXED | STORED | FAST)
    pub item_id: Field,
    /// Generated fields (JSON, TEXT | STORED)
    pub fields: Field,
}

impl CatalogSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a CatalogSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let namespace = schema
            .get_field(NAMESPACE_FIELD)
            .map_err(|_| SearchError::SchemaMismatch("missing namespace field".into()))?;
        let doc_id = schema
            .get_field(ID_FIELD)
            .map_err(|_| SearchError::SchemaMismatch("missing id field".into()))?;
        let item_id = schema
            .get_field(ITEM_ID_FIELD)
            .map_err(|_| SearchError::SchemaMismatch("missing itemId field".into()))?;
        let fields = schema
            .get_field(DYNAMIC_FIELDS)
            .map_err(|_| SearchError::SchemaMismatch("missing fields field".into()))?;

        Ok(Self {
            schema,
            namespace,
            doc_id,
            item_id,
            fields,
        })
    }
}

/// Build the catalog schema.
pub fn build_catalog_schema() -> CatalogSchema {
    let mut schema_builder = Schema::builder();

    let namespace = schema_builder.add_text_field(NAMESPACE_FIELD, STRING | STORED);

    // Primary key used for replace-on-add and lookups
    let doc_id = schema_builder.add_text_field(ID_FIELD, STRING | STORED);

    let item_id = schema_builder.add_i64_field(ITEM_ID_FIELD, INDEXED | STORED | FAST);

    let fields = schema_builder.add_json_field(DYNAMIC_FIELDS, TEXT | STORED);

    let schema = schema_builder.build();

    CatalogSchema {
        schema,
        namespace,
        doc_id,
        item_id,
        fields,
    }
}
