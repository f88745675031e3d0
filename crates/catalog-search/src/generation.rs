//! Index generation interface.
//!
//! A generation is one complete, independently addressable copy of the
//! search index. Writes are buffered until [`IndexGeneration::commit`];
//! readers only ever observe committed state.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;

use catalog_types::{FieldValue, IndexDocument};

use crate::error::SearchError;

/// Query that matches every document.
pub const DELETE_ALL_QUERY: &str = "*:*";

/// Operations the rebuild pipeline needs from a search engine target.
pub trait IndexGeneration: Send + Sync {
    /// Name of this generation for logging.
    fn name(&self) -> &str;

    /// Buffer documents for addition, replacing any with the same id.
    fn add(&self, documents: &[IndexDocument]) -> Result<(), SearchError>;

    /// Make buffered changes visible to readers.
    fn commit(&self) -> Result<(), SearchError>;

    /// Discard buffered changes.
    fn rollback(&self) -> Result<(), SearchError>;

    /// Compact the generation for query performance.
    fn optimize(&self) -> Result<(), SearchError>;

    /// Buffer deletion of every document matching the query.
    ///
    /// [`DELETE_ALL_QUERY`] must be supported.
    fn delete_by_query(&self, query: &str) -> Result<(), SearchError>;

    /// Number of committed documents.
    fn num_docs(&self) -> Result<u64, SearchError>;

    /// Look up a committed document by its unique id.
    fn get(&self, doc_id: &str) -> Result<Option<IndexDocument>, SearchError>;
}

enum PendingOp {
    Add(IndexDocument),
    DeleteAll,
    DeleteMatching { field: String, value: String },
}

#[derive(Default)]
struct MemoryState {
    committed: BTreeMap<String, IndexDocument>,
    pending: Vec<PendingOp>,
    commits: u64,
    optimizes: u64,
}

/// In-process generation backed by a map.
///
/// Supports `*:*` and single `field:value` delete queries.
pub struct MemoryGeneration {
    name: String,
    state: Mutex<MemoryState>,
}

impl MemoryGeneration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, SearchError> {
        self.state
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    /// Number of commits issued against this generation.
    pub fn commit_count(&self) -> u64 {
        self.lock().map(|s| s.commits).unwrap_or(0)
    }

    /// Number of optimize calls issued against this generation.
    pub fn optimize_count(&self) -> u64 {
        self.lock().map(|s| s.optimizes).unwrap_or(0)
    }

    /// Ids of all committed documents, sorted.
    pub fn document_ids(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.committed.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn value_matches(value: &FieldValue, expected: &str) -> bool {
    match value {
        FieldValue::Text(s) => s == expected,
        FieldValue::Integer(i) => i.to_string() == expected,
        FieldValue::Decimal(d) => d.to_string() == expected,
        FieldValue::Boolean(b) => b.to_string() == expected,
        FieldValue::Date(d) => d.to_rfc3339() == expected,
    }
}

impl IndexGeneration for MemoryGeneration {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, documents: &[IndexDocument]) -> Result<(), SearchError> {
        let mut state = self.lock()?;
        for document in documents {
            if document.id().is_none() {
                return Err(SearchError::InvalidDocument("missing id field".to_string()));
            }
            state.pending.push(PendingOp::Add(document.clone()));
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), SearchError> {
        let mut state = self.lock()?;
        let pending = std::mem::take(&mut state.pending);
        for op in pending {
            match op {
                PendingOp::Add(document) => {
                    if let Some(id) = document.id().map(str::to_string) {
                        state.committed.insert(id, document);
                    }
                }
                PendingOp::DeleteAll => state.committed.clear(),
                PendingOp::DeleteMatching { field, value } => state
                    .committed
                    .retain(|_, doc| !doc.values(&field).iter().any(|v| value_matches(v, &value))),
            }
        }
        state.commits += 1;
        debug!(generation = %self.name, docs = state.committed.len(), "Committed generation");
        Ok(())
    }

    fn rollback(&self) -> Result<(), SearchError> {
        self.lock()?.pending.clear();
        Ok(())
    }

    fn optimize(&self) -> Result<(), SearchError> {
        self.lock()?.optimizes += 1;
        Ok(())
    }

    fn delete_by_query(&self, query: &str) -> Result<(), SearchError> {
        let op = if query.trim() == DELETE_ALL_QUERY {
            PendingOp::DeleteAll
        } else {
            let (field, value) = query
                .split_once(':')
                .filter(|(f, v)| !f.is_empty() && !v.is_empty())
                .ok_or_else(|| SearchError::UnsupportedQuery(query.to_string()))?;
            PendingOp::DeleteMatching {
                field: field.to_string(),
                value: value.to_string(),
            }
        };
        self.lock()?.pending.push(op);
        Ok(())
    }

    fn num_docs(&self) -> Result<u64, SearchError> {
        Ok(self.lock()?.committed.len() as u64)
    }

    fn get(&self, doc_id: &str) -> Result<Option<IndexDocument>, SearchError> {
        Ok(self.lock()?.committed.get(doc_id).cloned())
    }
}
