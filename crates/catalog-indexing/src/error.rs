//! Error types for the rebuild pipeline.

use catalog_search::SearchError;
use catalog_types::CatalogError;
use thiserror::Error;

/// A registered extension handler failed.
#[derive(Debug, Error)]
#[error("Extension '{handler}' failed: {message}")]
pub struct ExtensionError {
    pub handler: String,
    pub message: String,
}

impl ExtensionError {
    pub fn new(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// Failure to produce a value for one field descriptor.
///
/// Never fatal: the document builder logs it and omits the field.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Property path does not follow `segment(.segment)*`
    #[error("Invalid property path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A path segment addressed nothing
    #[error("Property not found: {0}")]
    MissingProperty(String),

    /// The addressed value is an object or contains one
    #[error("Property '{0}' is not indexable")]
    NotIndexable(String),

    /// An extension handler failed while resolving
    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

/// Unit-of-work failures.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Could not begin transaction: {0}")]
    Begin(String),

    #[error("Could not commit transaction: {0}")]
    Commit(String),

    #[error("Could not roll back transaction: {0}")]
    Rollback(String),
}

/// Errors that end a rebuild.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// Engine or communication failure while writing or optimizing
    #[error("Could not rebuild index: {0}")]
    RebuildFailed(#[source] SearchError),

    /// Delete-all before or after the rebuild failed
    #[error("Could not delete documents: {0}")]
    DeleteFailed(#[source] SearchError),

    /// Catalog read failure
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Basic-field extension failure
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// Transaction manager failure
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Cancellation was requested between pages
    #[error("Rebuild cancelled")]
    Cancelled,

    /// Another rebuild holds this orchestrator
    #[error("A rebuild is already running")]
    AlreadyRunning,

    /// Rebuild configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background task running the rebuild died
    #[error("Rebuild task failed: {0}")]
    Task(String),
}
