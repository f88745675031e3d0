//! Error types for the catalog search system.

use thiserror::Error;

/// Errors raised by catalog collaborators and shared types.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catalog storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::Storage("connection reset".to_string());
        assert_eq!(err.to_string(), "Storage error: connection reset");

        let err = CatalogError::Config("page_size must be > 0".to_string());
        assert_eq!(err.to_string(), "Configuration error: page_size must be > 0");
    }
}
