//! Rebuild pipeline for the catalog search index.
//!
//! This crate turns catalog items into index documents and drives a full
//! rebuild into an out-of-service generation before swapping it live.
//!
//! ## Key Components
//!
//! - [`FieldValueResolver`]: extension chain plus property path lookup
//! - [`DocumentBuilder`]: identity, category, searchable and facet fields
//! - [`CatalogPaginator`]: paged reads inside read-only transactions
//! - [`RebuildOrchestrator`]: the rebuild state machine
//!
//! ## Example
//!
//! ```ignore
//! use catalog_indexing::{LoggingProgressCallback, RebuildConfig, RebuildOrchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = RebuildOrchestrator::new(
//!     RebuildConfig::from_settings(&settings),
//!     collaborators,
//!     generations,
//!     extensions,
//! )?;
//! let result = orchestrator.rebuild_index(&CancellationToken::new(), &LoggingProgressCallback::new(10))?;
//! println!("rebuilt in {}ms", result.elapsed_ms);
//! ```

pub mod builder;
pub mod collaborators;
pub mod context;
pub mod error;
pub mod extension;
pub mod naming;
pub mod paginator;
pub mod property_path;
pub mod rebuild;
pub mod resolver;
pub mod transaction;

pub use builder::DocumentBuilder;
pub use collaborators::{
    CatalogStore, FieldRegistry, InMemoryCatalog, LocaleDirectory, StaticFieldRegistry,
    StaticLocaleDirectory,
};
pub use context::{AmbientContext, ContextGuard, SharedRequestContext};
pub use error::{ExtensionError, RebuildError, ResolveError, TransactionError};
pub use extension::{ExtensionManager, ExtensionResult, SearchExtensionHandler, TranslationExtension};
pub use naming::{category_sort_field, document_id, property_field_name, CATEGORY_FIELD, EXPLICIT_CATEGORY_FIELD};
pub use paginator::{page_count, CatalogPaginator, REBUILD_TRANSACTION};
pub use property_path::{to_field_values, PropertyPath, PropertySource, ID_PROPERTY};
pub use rebuild::{
    rebuild_in_background, spawn_rebuild, LoggingProgressCallback, NoOpProgressCallback,
    ProgressCallback, RebuildCollaborators, RebuildConfig, RebuildOrchestrator, RebuildProgress,
    RebuildResult, RebuildState,
};
pub use resolver::{FieldValueResolver, PropertyValues, ResolveContext};
pub use transaction::{
    finalize_transaction, NoopTransactionManager, Propagation, Transaction, TransactionDefinition,
    TransactionManager,
};
