//! Catalog items and the category graph.
//!
//! Categories form a directed acyclic graph through their parent links.
//! Shared ancestors are expected, so hierarchy closures are sets rather
//! than paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldValue;

pub type ItemId = i64;
pub type CategoryId = i64;

/// A value in an item's open-ended attribute store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Value(FieldValue),
    List(Vec<AttributeValue>),
    Object(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Build an object from `(name, value)` pairs.
    pub fn object<K, V>(members: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        AttributeValue::Object(
            members
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Named member of an object.
    pub fn member(&self, name: &str) -> Option<&AttributeValue> {
        match self {
            AttributeValue::Object(members) => members.get(name),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&FieldValue> {
        match self {
            AttributeValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! attribute_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    AttributeValue::Value(value.into())
                }
            }
        )*
    };
}

attribute_from_value!(FieldValue, &str, String, i64, i32, f64, bool, DateTime<Utc>);

/// A catalog category.
#[derive(Debug)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Items directly assigned to this category, in display order
    pub item_ids: Vec<ItemId>,
    /// Parent categories (a category may have several)
    pub parents: Vec<Arc<Category>>,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            item_ids: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: Arc<Category>) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_items(mut self, item_ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.item_ids.extend(item_ids);
        self
    }

    /// Zero-based position of an item in this category's ordering.
    pub fn position_of(&self, item_id: ItemId) -> Option<usize> {
        self.item_ids.iter().position(|id| *id == item_id)
    }

    /// This category plus every ancestor reachable through parent links.
    ///
    /// Each category appears once even when reachable over several paths.
    pub fn hierarchy(&self) -> Vec<CategoryId> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        collect_hierarchy(self, &mut seen, &mut ordered);
        ordered
    }
}

fn collect_hierarchy(category: &Category, seen: &mut HashSet<CategoryId>, out: &mut Vec<CategoryId>) {
    if !seen.insert(category.id) {
        return;
    }
    out.push(category.id);
    for parent in &category.parents {
        collect_hierarchy(parent, seen, out);
    }
}

/// A sellable catalog item.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: ItemId,

    /// Categories the item is directly assigned to
    pub categories: Vec<Arc<Category>>,

    /// Open-ended attribute store
    pub attributes: BTreeMap<String, AttributeValue>,

    /// Localized text keyed by property path, then locale code
    pub translations: BTreeMap<String, BTreeMap<String, String>>,

    /// Start of the active window
    pub active_start: Option<DateTime<Utc>>,

    /// End of the active window (exclusive)
    pub active_end: Option<DateTime<Utc>>,
}

impl CatalogItem {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            categories: Vec::new(),
            attributes: BTreeMap::new(),
            translations: BTreeMap::new(),
            active_start: None,
            active_end: None,
        }
    }

    pub fn with_category(mut self, category: Arc<Category>) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_translation(
        mut self,
        property: impl Into<String>,
        locale_code: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.translations
            .entry(property.into())
            .or_default()
            .insert(locale_code.into(), text.into());
        self
    }

    pub fn with_active_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.active_start = start;
        self.active_end = end;
        self
    }

    /// Whether the item's active window contains `as_of`.
    pub fn is_active_at(&self, as_of: DateTime<Utc>) -> bool {
        let started = self.active_start.is_none_or(|start| start <= as_of);
        let not_ended = self.active_end.is_none_or(|end| as_of < end);
        started && not_ended
    }

    /// Deduplicated closure of all direct categories and their ancestors.
    pub fn category_closure(&self) -> Vec<CategoryId> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for category in &self.categories {
            collect_hierarchy(category, &mut seen, &mut ordered);
        }
        ordered
    }
}
