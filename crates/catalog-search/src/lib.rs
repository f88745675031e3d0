//! # catalog-search
//!
//! Index generations for catalog search, backed by Tantivy.
//!
//! This crate owns the write side of the search index used by catalog
//! rebuilds and the "which generation is active" pointer that queries follow.
//!
//! ## Features
//! - [`IndexGeneration`] trait: add, commit, rollback, optimize, delete-by-query
//! - [`TantivyGeneration`]: embedded on-disk generation with MmapDirectory
//! - [`MemoryGeneration`]: in-process generation with the same semantics
//! - [`GenerationManager`]: active/standby generations with an atomic swap,
//!   or a single shared generation in constrained deployments

pub mod document;
pub mod error;
pub mod generation;
pub mod index;
pub mod manager;
pub mod schema;
pub mod tantivy_generation;

pub use document::{from_tantivy_doc, to_tantivy_doc};
pub use error::SearchError;
pub use generation::{IndexGeneration, MemoryGeneration, DELETE_ALL_QUERY};
pub use index::{open_or_create_index, GenerationConfig};
pub use manager::GenerationManager;
pub use schema::{build_catalog_schema, CatalogSchema, DYNAMIC_FIELDS};
pub use tantivy_generation::TantivyGeneration;
