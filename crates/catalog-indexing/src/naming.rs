//! Index field naming.
//!
//! Generated names must be identical across rebuilds so queries built
//! against one generation keep working against the next.

use catalog_types::{CategoryId, FieldDescriptor, FieldType, ItemId};

/// Direct category membership.
pub const EXPLICIT_CATEGORY_FIELD: &str = "explicitCategory";

/// Hierarchy closure membership.
pub const CATEGORY_FIELD: &str = "category";

/// Name of a descriptor's field for one type and locale prefix.
///
/// Non-empty parts are joined with `_` in the order abbreviation, locale
/// prefix, type suffix.
pub fn property_field_name(descriptor: &FieldDescriptor, field_type: FieldType, prefix: &str) -> String {
    [descriptor.abbreviation.as_str(), prefix, field_type.suffix()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Field holding an item's position within a category.
pub fn category_sort_field(category_id: CategoryId) -> String {
    format!("category_{}_sort_i", category_id)
}

/// Unique document id for an item within a namespace.
pub fn document_id(namespace: &str, item_id: ItemId) -> String {
    format!("{}_{}", namespace, item_id)
}
