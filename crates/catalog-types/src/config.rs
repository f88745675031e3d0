//! Configuration loading for catalog search rebuilds.
//!
//! Layered config: defaults -> user config file -> explicit config file -> env vars.
//! The user config file lives at ~/.config/catalog-search/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CatalogError;

/// How index generations are laid out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// An active and a standby generation; rebuilds write the standby and swap (default)
    #[default]
    Dual,
    /// One generation that is cleared and rebuilt in place
    Shared,
}

/// Addressing convention for list-valued attributes read by name.
///
/// A property path `productAttributes.heatRange` selects the element of the
/// `productAttributes` list whose `name` is `heatRange` and reads its `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedListSettings {
    #[serde(default = "default_list_property")]
    pub list_property: String,

    #[serde(default = "default_key_member")]
    pub key_member: String,

    #[serde(default = "default_value_member")]
    pub value_member: String,
}

fn default_list_property() -> String {
    "productAttributes".to_string()
}

fn default_key_member() -> String {
    "name".to_string()
}

fn default_value_member() -> String {
    "value".to_string()
}

impl Default for MappedListSettings {
    fn default() -> Self {
        Self {
            list_property: default_list_property(),
            key_member: default_key_member(),
            value_member: default_value_member(),
        }
    }
}

/// Rebuild settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Number of catalog items read and written per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Namespace written into every document for tenant isolation
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Dual (active + standby) or shared generation layout
    #[serde(default)]
    pub generation_mode: GenerationMode,

    /// Directory holding the index generations
    #[serde(default = "default_index_root")]
    pub index_root: String,

    /// Memory budget for index writers in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Mapped-list property path convention
    #[serde(default)]
    pub mapped_list: MappedListSettings,
}

fn default_page_size() -> usize {
    100
}

fn default_namespace() -> String {
    "d".to_string()
}

fn default_index_root() -> String {
    ProjectDirs::from("", "", "catalog-search")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./index"))
        .to_string_lossy()
        .to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            namespace: default_namespace(),
            generation_mode: GenerationMode::default(),
            index_root: default_index_root(),
            writer_memory_mb: default_writer_memory_mb(),
            mapped_list: MappedListSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/catalog-search/config.toml)
    /// 3. Explicit config file (optional, must exist)
    /// 4. Environment variables (CATALOG_SEARCH_*, nested keys joined by `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self, CatalogError> {
        let config_dir = ProjectDirs::from("", "", "catalog-search")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("page_size", default_page_size() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("namespace", default_namespace())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("index_root", default_index_root())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: CATALOG_SEARCH_PAGE_SIZE, CATALOG_SEARCH_MAPPED_LIST__LIST_PROPERTY
        builder = builder.add_source(
            Environment::with_prefix("CATALOG_SEARCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.page_size == 0 {
            return Err(CatalogError::Config("page_size must be > 0".to_string()));
        }
        if self.namespace.is_empty() {
            return Err(CatalogError::Config("namespace must not be empty".to_string()));
        }
        if self.mapped_list.list_property.is_empty() {
            return Err(CatalogError::Config(
                "mapped_list.list_property must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory of the generation initially serving queries.
    pub fn primary_index_path(&self) -> PathBuf {
        PathBuf::from(&self.index_root).join("primary")
    }

    /// Directory of the standby generation (dual mode only).
    pub fn reindex_index_path(&self) -> PathBuf {
        PathBuf::from(&self.index_root).join("reindex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.namespace, "d");
        assert_eq!(settings.generation_mode, GenerationMode::Dual);
        assert_eq!(settings.mapped_list.list_property, "productAttributes");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let settings = Settings {
            page_size: 0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "page_size = 25").unwrap();
        writeln!(file, "generation_mode = \"shared\"").unwrap();
        writeln!(file, "[mapped_list]").unwrap();
        writeln!(file, "list_property = \"skuAttributes\"").unwrap();

        let settings = Settings::load(Some(&path.to_string_lossy())).unwrap();
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.generation_mode, GenerationMode::Shared);
        assert_eq!(settings.mapped_list.list_property, "skuAttributes");
        assert_eq!(settings.mapped_list.key_member, "name");
    }

    #[test]
    fn test_load_rejects_invalid_page_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "page_size = 0\n").unwrap();

        assert!(Settings::load(Some(&path.to_string_lossy())).is_err());
    }

    #[test]
    fn test_generation_paths() {
        let settings = Settings {
            index_root: "/var/lib/catalog".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.primary_index_path(), PathBuf::from("/var/lib/catalog/primary"));
        assert_eq!(settings.reindex_index_path(), PathBuf::from("/var/lib/catalog/reindex"));
    }
}
