//! Tantivy index management.
//!
//! Handles index creation and opening for on-disk generations.

use std::path::{Path, PathBuf};

use tantivy::Index;
use tracing::{debug, info};

use crate::error::SearchError;
use crate::schema::build_catalog_schema;

/// Default memory budget for IndexWriter (50MB)
const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// On-disk generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Generation name used in logs and the active marker
    pub name: String,
    /// Path to index directory
    pub index_path: PathBuf,
    /// Memory budget for writer in MB
    pub writer_memory_mb: usize,
}

impl GenerationConfig {
    pub fn new(name: impl Into<String>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            index_path: index_path.into(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

/// Open an existing index or create a new one.
///
/// Uses MmapDirectory for persistence.
pub fn open_or_create_index(path: &Path) -> Result<Index, SearchError> {
    if path.join("meta.json").exists() {
        debug!(path = ?path, "Opening existing index");
        let index = Index::open_in_dir(path)?;
        Ok(index)
    } else {
        info!(path = ?path, "Creating new index");
        std::fs::create_dir_all(path)?;
        let schema = build_catalog_schema();
        let index = Index::create_in_dir(path, schema.schema().clone())?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_new_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("primary");

        open_or_create_index(&path).unwrap();
        assert!(path.join("meta.json").exists());
    }

    #[test]
    fn test_reopen_existing_index() {
        let temp_dir = TempDir::new().unwrap();

        let _index1 = open_or_create_index(temp_dir.path()).unwrap();
        let index2 = open_or_create_index(temp_dir.path()).unwrap();
        assert!(index2.schema().get_field("fields").is_ok());
    }

    #[test]
    fn test_config_with_memory() {
        let config = GenerationConfig::new("primary", "/tmp/test").with_memory_mb(100);
        assert_eq!(config.writer_memory_mb, 100);
        assert_eq!(config.name, "primary");
    }
}
