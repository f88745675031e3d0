//! Index documents produced by the rebuild pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::FieldValue;

/// Field holding the tenant namespace.
pub const NAMESPACE_FIELD: &str = "namespace";

/// Field holding the globally unique document id.
pub const ID_FIELD: &str = "id";

/// Field holding the raw catalog item id.
pub const ITEM_ID_FIELD: &str = "itemId";

/// A search document: generated field name to one or more values.
///
/// Adding a value to a field that already exists appends to it, so every
/// field is multi-valued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexDocument {
    fields: BTreeMap<String, Vec<FieldValue>>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// Append several values to a field.
    pub fn add_values(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = FieldValue>) {
        self.fields.entry(name.into()).or_default().extend(values);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All values of a field, empty when absent.
    pub fn values(&self, name: &str) -> &[FieldValue] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_first(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(|values| values.first())
    }

    /// The unique document id, if attached.
    pub fn id(&self) -> Option<&str> {
        self.get_first(ID_FIELD).and_then(FieldValue::as_str)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<FieldValue>> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
