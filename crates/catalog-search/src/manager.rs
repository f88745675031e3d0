//! Active/standby generation management.
//!
//! Queries always go to the active generation. In dual mode rebuilds write
//! the standby generation, which is then promoted with a single atomic
//! pointer swap; readers holding the previous `Arc` keep a consistent view
//! of the old generation until they drop it. In shared mode there is one
//! generation that is cleared and rebuilt in place.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use catalog_types::{GenerationMode, IndexDocument, Settings};

use crate::error::SearchError;
use crate::generation::{IndexGeneration, DELETE_ALL_QUERY};
use crate::index::GenerationConfig;
use crate::tantivy_generation::TantivyGeneration;

/// File under the index root naming the active generation.
const ACTIVE_MARKER: &str = "ACTIVE";

struct Generations {
    active: Arc<dyn IndexGeneration>,
    standby: Option<Arc<dyn IndexGeneration>>,
}

/// Owns the active and standby generations.
pub struct GenerationManager {
    current: ArcSwap<Generations>,
    swap_lock: Mutex<()>,
    marker_path: Option<PathBuf>,
}

impl GenerationManager {
    /// Active generation serving queries plus a standby receiving rebuilds.
    pub fn dual(active: Arc<dyn IndexGeneration>, standby: Arc<dyn IndexGeneration>) -> Self {
        Self::from_generations(Generations {
            active,
            standby: Some(standby),
        })
    }

    /// A single generation that is both read and rebuilt.
    pub fn shared(generation: Arc<dyn IndexGeneration>) -> Self {
        Self::from_generations(Generations {
            active: generation,
            standby: None,
        })
    }

    fn from_generations(generations: Generations) -> Self {
        Self {
            current: ArcSwap::from_pointee(generations),
            swap_lock: Mutex::new(()),
            marker_path: None,
        }
    }

    /// Open Tantivy generations under `settings.index_root`.
    ///
    /// In dual mode the generation named by the active marker file (if any)
    /// is opened as active, and the marker is rewritten on every swap.
    pub fn open(settings: &Settings) -> Result<Self, SearchError> {
        let primary = GenerationConfig::new("primary", settings.primary_index_path())
            .with_memory_mb(settings.writer_memory_mb);

        match settings.generation_mode {
            GenerationMode::Shared => {
                let generation = TantivyGeneration::open(&primary)?;
                Ok(Self::shared(Arc::new(generation)))
            }
            GenerationMode::Dual => {
                let reindex = GenerationConfig::new("reindex", settings.reindex_index_path())
                    .with_memory_mb(settings.writer_memory_mb);
                let marker_path = Path::new(&settings.index_root).join(ACTIVE_MARKER);

                let (active, standby) = match read_marker(&marker_path)?.as_deref() {
                    Some("reindex") => (reindex, primary),
                    _ => (primary, reindex),
                };
                info!(active = %active.name, standby = %standby.name, "Opening dual generations");

                let mut manager = Self::dual(
                    Arc::new(TantivyGeneration::open(&active)?),
                    Arc::new(TantivyGeneration::open(&standby)?),
                );
                manager.marker_path = Some(marker_path);
                Ok(manager)
            }
        }
    }

    /// True when no distinct standby generation exists.
    pub fn is_shared_generation(&self) -> bool {
        self.current.load().standby.is_none()
    }

    /// The generation currently serving queries.
    pub fn active(&self) -> Arc<dyn IndexGeneration> {
        self.current.load().active.clone()
    }

    /// The generation a rebuild writes to: the standby, or the shared one.
    pub fn reindex_generation(&self) -> Arc<dyn IndexGeneration> {
        let current = self.current.load();
        current
            .standby
            .clone()
            .unwrap_or_else(|| current.active.clone())
    }

    /// Delete every document in `generation` and commit.
    pub fn clear_all(&self, generation: &dyn IndexGeneration) -> Result<(), SearchError> {
        debug!(generation = generation.name(), query = DELETE_ALL_QUERY, "Deleting by query");
        generation.delete_by_query(DELETE_ALL_QUERY)?;
        generation.commit()
    }

    /// Add a batch and commit it. Empty batches issue no commit.
    ///
    /// Buffered changes are rolled back when the add or commit fails.
    pub fn write_batch(
        &self,
        generation: &dyn IndexGeneration,
        documents: &[IndexDocument],
    ) -> Result<usize, SearchError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let result = generation.add(documents).and_then(|_| generation.commit());
        if let Err(e) = result {
            if let Err(rollback_err) = generation.rollback() {
                warn!(generation = generation.name(), error = %rollback_err, "Rollback after failed write failed");
            }
            return Err(e);
        }
        Ok(documents.len())
    }

    /// Compact `generation` for query performance.
    pub fn optimize(&self, generation: &dyn IndexGeneration) -> Result<(), SearchError> {
        debug!(generation = generation.name(), "Optimizing the index");
        generation.optimize()
    }

    /// Promote the standby to active and demote the active to standby.
    ///
    /// Readers calling [`active`](Self::active) after the swap get the new
    /// generation. A reader still holding the `Arc` it loaded before the
    /// swap keeps the demoted generation, which a rebuild clears right
    /// afterwards; such a reader may see it empty once that clear commits
    /// and should reload through `active()` per query.
    ///
    /// Returns `false` without doing anything in shared mode.
    pub fn swap(&self) -> Result<bool, SearchError> {
        let _guard = self
            .swap_lock
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        let current = self.current.load_full();
        let Some(standby) = current.standby.clone() else {
            debug!("Shared generation, nothing to swap");
            return Ok(false);
        };

        if let Some(marker_path) = &self.marker_path {
            write_marker(marker_path, standby.name())?;
        }

        self.current.store(Arc::new(Generations {
            active: standby.clone(),
            standby: Some(current.active.clone()),
        }));

        info!(
            active = standby.name(),
            standby = current.active.name(),
            "Swapped active generation"
        );
        Ok(true)
    }
}

fn read_marker(path: &Path) -> Result<Option<String>, SearchError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_marker(path: &Path, name: &str) -> Result<(), SearchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, name)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
