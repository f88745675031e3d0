//! Pluggable extension handlers.
//!
//! Handlers are consulted in registration order and the first one that
//! reports [`ExtensionResult::Handled`] wins.

use std::sync::Arc;

use catalog_types::{CatalogItem, FieldValue, IndexDocument};

use crate::error::ExtensionError;
use crate::resolver::{PropertyValues, ResolveContext};

/// Whether a handler took responsibility for a call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionResult<T> {
    Handled(T),
    NotHandled,
}

impl<T> ExtensionResult<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, ExtensionResult::Handled(_))
    }
}

/// Hook into document building and value resolution.
pub trait SearchExtensionHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Add fields to the document before category and property fields.
    fn attach_additional_basic_fields(
        &self,
        _item: &CatalogItem,
        _document: &mut IndexDocument,
    ) -> Result<ExtensionResult<()>, ExtensionError> {
        Ok(ExtensionResult::NotHandled)
    }

    /// Produce values for a descriptor instead of the default path lookup.
    fn resolve_property_values(
        &self,
        _context: &ResolveContext<'_>,
    ) -> Result<ExtensionResult<PropertyValues>, ExtensionError> {
        Ok(ExtensionResult::NotHandled)
    }
}

/// Ordered chain of extension handlers.
#[derive(Clone, Default)]
pub struct ExtensionManager {
    handlers: Vec<Arc<dyn SearchExtensionHandler>>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn SearchExtensionHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn SearchExtensionHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn attach_additional_basic_fields(
        &self,
        item: &CatalogItem,
        document: &mut IndexDocument,
    ) -> Result<ExtensionResult<()>, ExtensionError> {
        for handler in &self.handlers {
            if handler.attach_additional_basic_fields(item, document)?.is_handled() {
                return Ok(ExtensionResult::Handled(()));
            }
        }
        Ok(ExtensionResult::NotHandled)
    }

    pub fn resolve_property_values(
        &self,
        context: &ResolveContext<'_>,
    ) -> Result<ExtensionResult<PropertyValues>, ExtensionError> {
        for handler in &self.handlers {
            if let ExtensionResult::Handled(values) = handler.resolve_property_values(context)? {
                return Ok(ExtensionResult::Handled(values));
            }
        }
        Ok(ExtensionResult::NotHandled)
    }
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

/// Resolves localized properties from the item's translations.
///
/// Produces one entry per requested locale that has a translation, keyed
/// by the locale code.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranslationExtension;

impl SearchExtensionHandler for TranslationExtension {
    fn name(&self) -> &str {
        "translation"
    }

    fn resolve_property_values(
        &self,
        context: &ResolveContext<'_>,
    ) -> Result<ExtensionResult<PropertyValues>, ExtensionError> {
        let Some(translations) = context.item.translations.get(&context.descriptor.property_name) else {
            return Ok(ExtensionResult::NotHandled);
        };

        let values = context
            .locales
            .iter()
            .filter_map(|locale| {
                translations
                    .get(&locale.code)
                    .map(|text| (locale.code.clone(), vec![FieldValue::from(text.as_str())]))
            })
            .collect();
        Ok(ExtensionResult::Handled(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::{FieldDescriptor, FieldType, Locale, RequestContext};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        handles: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(name: &'static str, handles: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                handles,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SearchExtensionHandler for Counting {
        fn name(&self) -> &str {
            self.name
        }

        fn attach_additional_basic_fields(
            &self,
            _item: &CatalogItem,
            document: &mut IndexDocument,
        ) -> Result<ExtensionResult<()>, ExtensionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.handles {
                document.add_field("attachedBy", self.name);
                Ok(ExtensionResult::Handled(()))
            } else {
                Ok(ExtensionResult::NotHandled)
            }
        }
    }

    #[test]
    fn test_first_handler_wins() {
        let first = Counting::new("first", false);
        let second = Counting::new("second", true);
        let third = Counting::new("third", true);
        let manager = ExtensionManager::new()
            .with_handler(first.clone())
            .with_handler(second.clone())
            .with_handler(third.clone());

        let mut doc = IndexDocument::new();
        let result = manager
            .attach_additional_basic_fields(&CatalogItem::new(1), &mut doc)
            .unwrap();

        assert!(result.is_handled());
        assert_eq!(doc.values("attachedBy"), &[FieldValue::from("second")]);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_chain_not_handled() {
        let manager = ExtensionManager::new();
        let mut doc = IndexDocument::new();
        let result = manager
            .attach_additional_basic_fields(&CatalogItem::new(1), &mut doc)
            .unwrap();
        assert_eq!(result, ExtensionResult::NotHandled);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_translation_extension() {
        let item = CatalogItem::new(1)
            .with_translation("description", "en_US", "Hot")
            .with_translation("description", "es_ES", "Caliente");
        let descriptor = FieldDescriptor::new("description", "description").searchable_as([FieldType::Text]);
        let locales = vec![Locale::new("en_US"), Locale::new("es_ES"), Locale::new("fr_FR")];
        let request = RequestContext::default();
        let context = ResolveContext {
            item: &item,
            descriptor: &descriptor,
            field_type: FieldType::Text,
            locales: &locales,
            request: &request,
        };

        let ExtensionResult::Handled(values) = TranslationExtension.resolve_property_values(&context).unwrap() else {
            panic!("translation not handled");
        };
        assert_eq!(values.len(), 2);
        assert_eq!(values["es_ES"], vec![FieldValue::from("Caliente")]);
        assert!(!values.contains_key("fr_FR"));
    }

    #[test]
    fn test_translation_extension_skips_untranslated_property() {
        let item = CatalogItem::new(1).with_attribute("name", "Sauce");
        let descriptor = FieldDescriptor::new("name", "name");
        let request = RequestContext::default();
        let context = ResolveContext {
            item: &item,
            descriptor: &descriptor,
            field_type: FieldType::String,
            locales: &[],
            request: &request,
        };

        let result = TranslationExtension.resolve_property_values(&context).unwrap();
        assert!(!result.is_handled());
    }
}
