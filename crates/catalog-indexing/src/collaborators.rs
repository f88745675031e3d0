//! Catalog-side collaborators of a rebuild.
//!
//! The rebuild reads items, field configuration and locales through these
//! traits. In-process implementations are provided for tests and for
//! embedding callers whose catalog already lives in memory.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use catalog_types::{CatalogError, CatalogItem, FieldDescriptor, Locale};

/// Source of catalog items that are active at a given instant.
///
/// Implementations must return a stable ordering so consecutive pages
/// neither overlap nor skip items.
pub trait CatalogStore: Send + Sync {
    fn count_active(&self, as_of: DateTime<Utc>) -> Result<u64, CatalogError>;

    fn page_active(
        &self,
        page: usize,
        page_size: usize,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<CatalogItem>, CatalogError>;
}

/// Field configuration for the index.
pub trait FieldRegistry: Send + Sync {
    fn searchable_field_descriptors(&self) -> Result<Vec<FieldDescriptor>, CatalogError>;
}

/// Locales the index is materialized for.
pub trait LocaleDirectory: Send + Sync {
    fn all_locales(&self) -> Result<Vec<Locale>, CatalogError>;
}

/// Fixed list of field descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticFieldRegistry {
    descriptors: Vec<FieldDescriptor>,
}

impl StaticFieldRegistry {
    pub fn new(descriptors: Vec<FieldDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl FieldRegistry for StaticFieldRegistry {
    fn searchable_field_descriptors(&self) -> Result<Vec<FieldDescriptor>, CatalogError> {
        Ok(self.descriptors.clone())
    }
}

/// Fixed list of locales.
#[derive(Debug, Clone, Default)]
pub struct StaticLocaleDirectory {
    locales: Vec<Locale>,
}

impl StaticLocaleDirectory {
    pub fn new(locales: Vec<Locale>) -> Self {
        Self { locales }
    }
}

impl LocaleDirectory for StaticLocaleDirectory {
    fn all_locales(&self) -> Result<Vec<Locale>, CatalogError> {
        Ok(self.locales.clone())
    }
}

/// Catalog held in memory, ordered by item id.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<Vec<CatalogItem>>,
}

impl InMemoryCatalog {
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let mut items: Vec<CatalogItem> = items.into_iter().collect();
        items.sort_by_key(|item| item.id);
        Self {
            items: RwLock::new(items),
        }
    }

    /// Insert or replace an item.
    pub fn upsert(&self, item: CatalogItem) -> Result<(), CatalogError> {
        let mut items = self
            .items
            .write()
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        match items.binary_search_by_key(&item.id, |existing| existing.id) {
            Ok(pos) => items[pos] = item,
            Err(pos) => items.insert(pos, item),
        }
        Ok(())
    }

    fn active(&self, as_of: DateTime<Utc>) -> Result<Vec<CatalogItem>, CatalogError> {
        let items = self
            .items
            .read()
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        Ok(items
            .iter()
            .filter(|item| item.is_active_at(as_of))
            .cloned()
            .collect())
    }
}

impl CatalogStore for InMemoryCatalog {
    fn count_active(&self, as_of: DateTime<Utc>) -> Result<u64, CatalogError> {
        Ok(self.active(as_of)?.len() as u64)
    }

    fn page_active(
        &self,
        page: usize,
        page_size: usize,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self
            .active(as_of)?
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn catalog() -> InMemoryCatalog {
        let now = Utc::now();
        InMemoryCatalog::new([
            CatalogItem::new(3),
            CatalogItem::new(1),
            CatalogItem::new(2).with_active_window(Some(now + Duration::days(1)), None),
            CatalogItem::new(5),
            CatalogItem::new(4),
        ])
    }

    #[test]
    fn test_count_excludes_inactive() {
        assert_eq!(catalog().count_active(Utc::now()).unwrap(), 4);
    }

    #[test]
    fn test_pages_are_ordered_and_disjoint() {
        let catalog = catalog();
        let now = Utc::now();

        let ids = |page| -> Vec<i64> {
            catalog
                .page_active(page, 3, now)
                .unwrap()
                .iter()
                .map(|i| i.id)
                .collect()
        };
        assert_eq!(ids(0), vec![1, 3, 4]);
        assert_eq!(ids(1), vec![5]);
        assert!(ids(2).is_empty());
    }

    #[test]
    fn test_upsert_keeps_order() {
        let catalog = catalog();
        catalog.upsert(CatalogItem::new(0)).unwrap();
        catalog.upsert(CatalogItem::new(3).with_attribute("name", "Replaced")).unwrap();

        let page = catalog.page_active(0, 10, Utc::now()).unwrap();
        let ids: Vec<i64> = page.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![0, 1, 3, 4, 5]);
        assert!(page[2].attributes.contains_key("name"));
    }

    #[test]
    fn test_static_registries() {
        let fields = StaticFieldRegistry::new(vec![FieldDescriptor::new("name", "name")]);
        assert_eq!(fields.searchable_field_descriptors().unwrap().len(), 1);

        let locales = StaticLocaleDirectory::new(vec![Locale::new("en_US").as_default()]);
        assert_eq!(locales.all_locales().unwrap()[0].code, "en_US");
    }
}
