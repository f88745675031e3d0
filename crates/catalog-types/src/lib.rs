//! # catalog-types
//!
//! Shared domain types for catalog search index rebuilds.
//!
//! This crate defines the core data structures used throughout the system:
//! - Catalog items, categories and their attribute stores
//! - Field descriptors, field types and locales
//! - Index documents produced for the search engine
//! - Request context and rebuild settings
//!
//! ## Usage
//!
//! ```rust
//! use catalog_types::{CatalogItem, IndexDocument};
//!
//! let item = CatalogItem::new(42).with_attribute("name", "Hot Sauce");
//! let mut doc = IndexDocument::new();
//! doc.add_field("itemId", item.id);
//! assert!(doc.contains("itemId"));
//! ```

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod field;
pub mod item;

pub use config::{GenerationMode, MappedListSettings, Settings};
pub use context::RequestContext;
pub use document::{IndexDocument, ID_FIELD, ITEM_ID_FIELD, NAMESPACE_FIELD};
pub use error::CatalogError;
pub use field::{FieldDescriptor, FieldType, FieldValue, Locale};
pub use item::{AttributeValue, CatalogItem, Category, CategoryId, ItemId};
