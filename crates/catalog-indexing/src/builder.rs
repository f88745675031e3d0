//! Catalog item to index document conversion.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use catalog_types::{
    CatalogItem, FieldDescriptor, FieldType, IndexDocument, Locale, MappedListSettings, RequestContext,
    ID_FIELD, ITEM_ID_FIELD, NAMESPACE_FIELD,
};

use crate::error::{ExtensionError, ResolveError};
use crate::extension::ExtensionManager;
use crate::naming::{category_sort_field, document_id, property_field_name, CATEGORY_FIELD, EXPLICIT_CATEGORY_FIELD};
use crate::resolver::{FieldValueResolver, ResolveContext};

/// Builds one index document per catalog item.
pub struct DocumentBuilder {
    namespace: String,
    extensions: Arc<ExtensionManager>,
    resolver: FieldValueResolver,
}

impl DocumentBuilder {
    pub fn new(namespace: impl Into<String>, extensions: Arc<ExtensionManager>, mapped_list: MappedListSettings) -> Self {
        Self {
            namespace: namespace.into(),
            resolver: FieldValueResolver::new(extensions.clone(), mapped_list),
            extensions,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Build the document for `item`.
    ///
    /// Failures resolving a single descriptor are traced and that field is
    /// left out. Only basic-field extension failures abort the build.
    pub fn build(
        &self,
        item: &CatalogItem,
        descriptors: &[FieldDescriptor],
        locales: &[Locale],
        request: &RequestContext,
    ) -> Result<IndexDocument, ExtensionError> {
        let mut document = IndexDocument::new();
        self.attach_basic_document_fields(item, &mut document)?;

        let mut added = HashSet::new();
        for descriptor in descriptors {
            if let Err(e) = self.attach_descriptor(item, descriptor, locales, request, &mut document, &mut added) {
                trace!(
                    field = %descriptor.qualified_name(),
                    item_id = item.id,
                    error = %e,
                    "Could not get value for property"
                );
            }
        }

        Ok(document)
    }

    fn attach_basic_document_fields(&self, item: &CatalogItem, document: &mut IndexDocument) -> Result<(), ExtensionError> {
        document.add_field(NAMESPACE_FIELD, self.namespace.as_str());
        document.add_field(ID_FIELD, document_id(&self.namespace, item.id));
        document.add_field(ITEM_ID_FIELD, item.id);

        self.extensions.attach_additional_basic_fields(item, document)?;

        for category in &item.categories {
            document.add_field(EXPLICIT_CATEGORY_FIELD, category.id);
            let position = category
                .position_of(item.id)
                .and_then(|p| i64::try_from(p).ok())
                .unwrap_or(-1);
            document.add_field(category_sort_field(category.id), position);
        }

        for category_id in item.category_closure() {
            document.add_field(CATEGORY_FIELD, category_id);
        }
        Ok(())
    }

    fn attach_descriptor(
        &self,
        item: &CatalogItem,
        descriptor: &FieldDescriptor,
        locales: &[Locale],
        request: &RequestContext,
        document: &mut IndexDocument,
        added: &mut HashSet<String>,
    ) -> Result<(), ResolveError> {
        let context = move |field_type: FieldType| ResolveContext {
            item,
            descriptor,
            field_type,
            locales,
            request,
        };

        if descriptor.searchable {
            for field_type in &descriptor.searchable_field_types {
                let values = self.resolver.resolve(&context(*field_type))?;
                for (prefix, values) in values {
                    let name = property_field_name(descriptor, *field_type, &prefix);
                    document.add_values(name.clone(), values);
                    added.insert(name);
                }
            }
        }

        if let Some(facet_type) = descriptor.facet_field_type {
            let values = self.resolver.resolve(&context(facet_type))?;
            for (prefix, values) in values {
                let name = property_field_name(descriptor, facet_type, &prefix);
                // Only searchable names suppress a facet
                if !added.contains(&name) {
                    document.add_values(name, values);
                }
            }
        }
        Ok(())
    }
}
