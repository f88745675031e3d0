//! Search error types.

use thiserror::Error;

/// Errors that can occur while writing to or reading from an index generation.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Query parse error
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document could not be mapped onto the index schema
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Index is locked (another process has it open)
    #[error("Index is locked: {0}")]
    IndexLocked(String),

    /// The engine could not be reached
    #[error("Communication error: {0}")]
    Communication(String),

    /// The engine refused the request
    #[error("Engine rejected request: {0}")]
    Rejected(String),

    /// Query syntax not supported by this generation
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
}
