//! Tantivy-backed index generation.
//!
//! Wraps an IndexWriter behind a mutex and a manually reloaded reader.
//! Documents are not visible until commit() is called; the reader is
//! reloaded right after every commit so counts and lookups are current.

use std::sync::{Arc, Mutex, MutexGuard};

use tantivy::collector::{Count, TopDocs};
use tantivy::merge_policy::NoMergePolicy;
use tantivy::query::{QueryParser, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info, warn};

use catalog_types::IndexDocument;

use crate::document::{from_tantivy_doc, to_tantivy_doc};
use crate::error::SearchError;
use crate::generation::{IndexGeneration, DELETE_ALL_QUERY};
use crate::index::{open_or_create_index, GenerationConfig};
use crate::schema::CatalogSchema;

/// An on-disk generation stored in its own Tantivy index directory.
pub struct TantivyGeneration {
    name: String,
    index: Index,
    schema: CatalogSchema,
    writer: Arc<Mutex<IndexWriter>>,
    reader: IndexReader,
}

impl TantivyGeneration {
    /// Open or create the generation described by `config`.
    ///
    /// Background merging is disabled; segments are only merged by
    /// [`IndexGeneration::optimize`].
    pub fn open(config: &GenerationConfig) -> Result<Self, SearchError> {
        let index = open_or_create_index(&config.index_path)?;
        let schema = CatalogSchema::from_schema(index.schema())?;

        let memory_budget = config.writer_memory_mb * 1024 * 1024;
        let writer: IndexWriter = index.writer(memory_budget)?;
        writer.set_merge_policy(Box::new(NoMergePolicy));

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        info!(
            generation = %config.name,
            path = ?config.index_path,
            memory_mb = config.writer_memory_mb,
            "Opened index generation"
        );

        Ok(Self {
            name: config.name.clone(),
            index,
            schema,
            writer: Arc::new(Mutex::new(writer)),
            reader,
        })
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>, SearchError> {
        self.writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    fn query_parser(&self) -> QueryParser {
        QueryParser::for_index(
            &self.index,
            vec![self.schema.doc_id, self.schema.namespace, self.schema.fields],
        )
    }

    /// Count committed documents matching a query.
    pub fn count(&self, query: &str) -> Result<usize, SearchError> {
        let query = self.query_parser().parse_query(query)?;
        let searcher = self.reader.searcher();
        Ok(searcher.search(&query, &Count)?)
    }

    /// Number of searchable segments, mostly useful after optimize.
    pub fn segment_count(&self) -> Result<usize, SearchError> {
        Ok(self.index.searchable_segment_ids()?.len())
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }
}

impl IndexGeneration for TantivyGeneration {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, documents: &[IndexDocument]) -> Result<(), SearchError> {
        let writer = self.lock_writer()?;

        for document in documents {
            let doc = to_tantivy_doc(&self.schema, document)?;

            // Replace any previous document with the same id
            if let Some(doc_id) = document.id() {
                writer.delete_term(Term::from_field_text(self.schema.doc_id, doc_id));
            }
            writer.add_document(doc)?;
        }

        debug!(generation = %self.name, count = documents.len(), "Added documents");
        Ok(())
    }

    fn commit(&self) -> Result<(), SearchError> {
        let mut writer = self.lock_writer()?;
        let opstamp = writer.commit()?;
        self.reader.reload()?;
        debug!(generation = %self.name, opstamp, "Committed generation");
        Ok(())
    }

    fn rollback(&self) -> Result<(), SearchError> {
        let mut writer = self.lock_writer()?;
        let opstamp = writer.rollback()?;
        warn!(generation = %self.name, opstamp, "Rolled back uncommitted changes");
        Ok(())
    }

    fn optimize(&self) -> Result<(), SearchError> {
        let segment_ids = self.index.searchable_segment_ids()?;
        let mut writer = self.lock_writer()?;

        if segment_ids.len() > 1 {
            writer.merge(&segment_ids).wait()?;
        }
        writer.garbage_collect_files().wait()?;
        self.reader.reload()?;

        info!(
            generation = %self.name,
            merged_segments = segment_ids.len(),
            "Optimized generation"
        );
        Ok(())
    }

    fn delete_by_query(&self, query: &str) -> Result<(), SearchError> {
        let writer = self.lock_writer()?;

        if query.trim() == DELETE_ALL_QUERY {
            writer.delete_all_documents()?;
        } else {
            let parsed = self.query_parser().parse_query(query)?;
            writer.delete_query(parsed)?;
        }

        debug!(generation = %self.name, query, "Deleted by query");
        Ok(())
    }

    fn num_docs(&self) -> Result<u64, SearchError> {
        Ok(self.reader.searcher().num_docs())
    }

    fn get(&self, doc_id: &str) -> Result<Option<IndexDocument>, SearchError> {
        let searcher = self.reader.searcher();
        let term = Term::from_field_text(self.schema.doc_id, doc_id);
        let query = TermQuery::new(term, IndexRecordOption::Basic);

        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        match top_docs.first() {
            Some((_score, address)) => {
                let doc: TantivyDocument = searcher.doc(*address)?;
                Ok(Some(from_tantivy_doc(&self.schema, &doc)?))
            }
            None => Ok(None),
        }
    }
}
