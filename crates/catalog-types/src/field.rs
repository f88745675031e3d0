//! Field configuration types.
//!
//! A [`FieldDescriptor`] names a logical property of a catalog item and says
//! how it should be stored in the search index: once per searchable
//! [`FieldType`], and optionally once more as a facet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage/analysis type of an index field.
///
/// Each type maps to a stable suffix that becomes part of generated field
/// names. `Text` is the engine's default analyzed type and has no suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    String,
    Strings,
    Integer,
    Integers,
    Long,
    Decimal,
    Decimals,
    Boolean,
    Date,
    Price,
}

impl FieldType {
    /// Suffix appended to generated field names.
    pub fn suffix(&self) -> &'static str {
        match self {
            FieldType::Text => "",
            FieldType::String => "s",
            FieldType::Strings => "ss",
            FieldType::Integer => "i",
            FieldType::Integers => "is",
            FieldType::Long => "l",
            FieldType::Decimal => "d",
            FieldType::Decimals => "ds",
            FieldType::Boolean => "b",
            FieldType::Date => "dt",
            FieldType::Price => "p",
        }
    }

    /// Whether the type holds more than one value per document.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            FieldType::Strings | FieldType::Integers | FieldType::Decimals
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::String => "string",
            FieldType::Strings => "strings",
            FieldType::Integer => "integer",
            FieldType::Integers => "integers",
            FieldType::Long => "long",
            FieldType::Decimal => "decimal",
            FieldType::Decimals => "decimals",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Price => "price",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single indexable value.
///
/// Serialized untagged, so decoding picks the first variant that fits:
/// an RFC 3339 string comes back as [`FieldValue::Date`] even when it was
/// stored as text, and a whole-number decimal written as `5.0` stays a
/// decimal. Producers that need such strings as text must not rely on a
/// stored round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

/// Configuration of one indexed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Property path evaluated against the item (e.g. `productAttributes.color`)
    pub property_name: String,

    /// Short name used when generating index field names
    pub abbreviation: String,

    /// Whether the property is indexed for search
    #[serde(default)]
    pub searchable: bool,

    /// Types the value is stored under when searchable
    #[serde(default)]
    pub searchable_field_types: Vec<FieldType>,

    /// Type used to additionally store the value as a facet
    #[serde(default)]
    pub facet_field_type: Option<FieldType>,
}

impl FieldDescriptor {
    /// Create a descriptor that is neither searchable nor faceted yet.
    pub fn new(property_name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            abbreviation: abbreviation.into(),
            searchable: false,
            searchable_field_types: Vec::new(),
            facet_field_type: None,
        }
    }

    /// Mark searchable under the given types.
    pub fn searchable_as(mut self, types: impl IntoIterator<Item = FieldType>) -> Self {
        self.searchable = true;
        self.searchable_field_types = types.into_iter().collect();
        self
    }

    /// Also store as a facet under the given type.
    pub fn with_facet(mut self, facet_type: FieldType) -> Self {
        self.facet_field_type = Some(facet_type);
        self
    }

    /// Fully qualified name used in logs.
    pub fn qualified_name(&self) -> String {
        format!("item.{}", self.property_name)
    }
}

/// A locale the index is materialized for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    /// Locale code, e.g. `en_US`
    pub code: String,

    /// Human readable name
    #[serde(default)]
    pub friendly_name: Option<String>,

    /// Whether this is the catalog's default locale
    #[serde(default)]
    pub is_default: bool,
}

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            friendly_name: None,
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}
