//! Field value resolution.
//!
//! Extensions get the first chance to supply values for a descriptor; when
//! none handles it the descriptor's property path is evaluated against the
//! item and yields values under the empty (non-localized) prefix.

use std::collections::BTreeMap;
use std::sync::Arc;

use catalog_types::{CatalogItem, FieldDescriptor, FieldType, FieldValue, Locale, MappedListSettings, RequestContext};

use crate::error::ResolveError;
use crate::extension::{ExtensionManager, ExtensionResult};
use crate::property_path::{to_field_values, PropertyPath};

/// Values keyed by locale prefix. The empty prefix means not localized.
pub type PropertyValues = BTreeMap<String, Vec<FieldValue>>;

/// Everything a resolution may depend on.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub item: &'a CatalogItem,
    pub descriptor: &'a FieldDescriptor,
    pub field_type: FieldType,
    pub locales: &'a [Locale],
    pub request: &'a RequestContext,
}

pub struct FieldValueResolver {
    extensions: Arc<ExtensionManager>,
    mapped_list: MappedListSettings,
}

impl FieldValueResolver {
    pub fn new(extensions: Arc<ExtensionManager>, mapped_list: MappedListSettings) -> Self {
        Self {
            extensions,
            mapped_list,
        }
    }

    pub fn resolve(&self, context: &ResolveContext<'_>) -> Result<PropertyValues, ResolveError> {
        if let ExtensionResult::Handled(values) = self.extensions.resolve_property_values(context)? {
            return Ok(values);
        }

        let path = PropertyPath::parse(&context.descriptor.property_name, &self.mapped_list)?;
        let value = path.evaluate(context.item)?;
        let values = to_field_values(&value, path.as_str())?;
        Ok(PropertyValues::from([(String::new(), values)]))
    }
}
