//! Full index rebuild.
//!
//! A rebuild pages through every active catalog item, writes one document
//! per item into the reindex generation and then promotes that generation
//! with a single swap. Queries keep hitting the previous generation until
//! the swap. The reindex generation is cleared before the first page, so
//! in shared mode the single generation is rebuilt in place, and in dual
//! mode the demoted generation is cleared again after the swap.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use catalog_search::GenerationManager;
use catalog_types::{IndexDocument, Locale, MappedListSettings, RequestContext, Settings};

use crate::builder::DocumentBuilder;
use crate::collaborators::{CatalogStore, FieldRegistry, LocaleDirectory};
use crate::context::{AmbientContext, ContextGuard};
use crate::error::RebuildError;
use crate::extension::ExtensionManager;
use crate::paginator::{page_count, CatalogPaginator};
use crate::transaction::{finalize_transaction, Transaction, TransactionManager};

/// Configuration for index rebuild operations.
#[derive(Debug, Clone)]
pub struct RebuildConfig {
    /// Items read, built and committed together.
    pub page_size: usize,
    /// Namespace written to every document and used in document ids.
    pub namespace: String,
    /// Mapped list lookup used by property paths.
    pub mapped_list: MappedListSettings,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            page_size: settings.page_size,
            namespace: settings.namespace,
            mapped_list: settings.mapped_list,
        }
    }
}

impl RebuildConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            page_size: settings.page_size,
            namespace: settings.namespace.clone(),
            mapped_list: settings.mapped_list.clone(),
        }
    }

    /// Set the page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the document namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn validate(&self) -> Result<(), RebuildError> {
        if self.page_size == 0 {
            return Err(RebuildError::InvalidConfig("page_size must be positive".to_string()));
        }
        if self.namespace.is_empty() {
            return Err(RebuildError::InvalidConfig("namespace must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Where a rebuild currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildState {
    #[default]
    Idle,
    Preparing,
    Paging,
    Finalizing,
    Swapping,
    Cleaning,
    Done,
    Failed,
}

impl RebuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RebuildState::Idle => "idle",
            RebuildState::Preparing => "preparing",
            RebuildState::Paging => "paging",
            RebuildState::Finalizing => "finalizing",
            RebuildState::Swapping => "swapping",
            RebuildState::Cleaning => "cleaning",
            RebuildState::Done => "done",
            RebuildState::Failed => "failed",
        }
    }
}

impl fmt::Display for RebuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress tracking for rebuild operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildProgress {
    /// Instant the catalog was read as of.
    pub as_of: Option<DateTime<Utc>>,
    /// Active items counted at the start of paging.
    pub total_items: u64,
    /// Pages needed to cover `total_items`.
    pub total_pages: u64,
    /// Pages committed so far.
    pub pages_processed: u64,
    /// Documents written so far.
    pub documents_written: u64,
    /// Whether the rebuild completed successfully.
    pub completed: bool,
}

impl RebuildProgress {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of: Some(as_of),
            ..Default::default()
        }
    }

    /// Record a committed page.
    pub fn record_page(&mut self, documents: usize) {
        self.pages_processed += 1;
        self.documents_written += documents as u64;
    }

    /// Mark as completed.
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }
}

/// Result of a rebuild operation.
#[derive(Debug, Clone)]
pub struct RebuildResult {
    /// Progress statistics.
    pub progress: RebuildProgress,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
    /// Whether the active generation changed.
    pub swapped: bool,
}

/// Trait for receiving rebuild progress updates.
pub trait ProgressCallback: Send {
    /// Called after each committed page and once on completion.
    fn on_progress(&self, progress: &RebuildProgress);
}

/// A no-op progress callback for when progress reporting isn't needed.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_progress(&self, _progress: &RebuildProgress) {}
}

/// A callback that logs progress at info level every `every_pages` pages.
pub struct LoggingProgressCallback {
    every_pages: u64,
}

impl LoggingProgressCallback {
    pub fn new(every_pages: u64) -> Self {
        Self { every_pages }
    }
}

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, progress: &RebuildProgress) {
        if progress.completed || progress.pages_processed.is_multiple_of(self.every_pages) {
            info!(
                pages = progress.pages_processed,
                total_pages = progress.total_pages,
                documents = progress.documents_written,
                completed = progress.completed,
                "Rebuild progress"
            );
        }
    }
}

/// Catalog-side services a rebuild reads from.
#[derive(Clone)]
pub struct RebuildCollaborators {
    pub catalog: Arc<dyn CatalogStore>,
    pub fields: Arc<dyn FieldRegistry>,
    pub locales: Arc<dyn LocaleDirectory>,
    pub transactions: Arc<dyn TransactionManager>,
    pub context: Arc<dyn AmbientContext>,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, RebuildError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RebuildError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives a rebuild through its states.
pub struct RebuildOrchestrator {
    config: RebuildConfig,
    collaborators: RebuildCollaborators,
    generations: Arc<GenerationManager>,
    builder: DocumentBuilder,
    paginator: CatalogPaginator,
    state: Mutex<RebuildState>,
    running: AtomicBool,
}

impl RebuildOrchestrator {
    pub fn new(
        config: RebuildConfig,
        collaborators: RebuildCollaborators,
        generations: Arc<GenerationManager>,
        extensions: ExtensionManager,
    ) -> Result<Self, RebuildError> {
        config.validate()?;

        let builder = DocumentBuilder::new(
            config.namespace.clone(),
            Arc::new(extensions),
            config.mapped_list.clone(),
        );
        let paginator = CatalogPaginator::new(
            collaborators.catalog.clone(),
            collaborators.transactions.clone(),
        );

        Ok(Self {
            config,
            collaborators,
            generations,
            builder,
            paginator,
            state: Mutex::new(RebuildState::Idle),
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RebuildConfig {
        &self.config
    }

    pub fn generations(&self) -> &Arc<GenerationManager> {
        &self.generations
    }

    pub fn state(&self) -> RebuildState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn transition(&self, next: RebuildState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(from = %*state, to = %next, "Rebuild state transition");
        *state = next;
    }

    /// Rebuild the index from the catalog as it is now.
    pub fn rebuild_index<P: ProgressCallback>(
        &self,
        cancel: &CancellationToken,
        progress_callback: &P,
    ) -> Result<RebuildResult, RebuildError> {
        self.rebuild_index_as_of(Utc::now(), cancel, progress_callback)
    }

    /// Rebuild the index from the catalog as of `as_of`.
    pub fn rebuild_index_as_of<P: ProgressCallback>(
        &self,
        as_of: DateTime<Utc>,
        cancel: &CancellationToken,
        progress_callback: &P,
    ) -> Result<RebuildResult, RebuildError> {
        let _running = RunningGuard::acquire(&self.running)?;
        let started = Instant::now();
        let mut progress = RebuildProgress::new(as_of);

        info!(%as_of, page_size = self.config.page_size, "Rebuilding the index");

        match self.run(as_of, cancel, progress_callback, &mut progress) {
            Ok(swapped) => {
                self.transition(RebuildState::Done);
                progress.mark_completed();
                progress_callback.on_progress(&progress);

                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!(
                    elapsed_ms,
                    documents = progress.documents_written,
                    pages = progress.pages_processed,
                    "Finished building index"
                );
                Ok(RebuildResult {
                    progress,
                    elapsed_ms,
                    swapped,
                })
            }
            Err(e) => {
                self.transition(RebuildState::Failed);
                warn!(error = %e, pages = progress.pages_processed, "Index rebuild failed");
                Err(e)
            }
        }
    }

    fn run<P: ProgressCallback>(
        &self,
        as_of: DateTime<Utc>,
        cancel: &CancellationToken,
        progress_callback: &P,
        progress: &mut RebuildProgress,
    ) -> Result<bool, RebuildError> {
        self.transition(RebuildState::Preparing);
        let context = ContextGuard::capture(self.collaborators.context.as_ref());
        let shared = self.generations.is_shared_generation();

        // Start from an empty target. In dual mode this drops whatever an
        // aborted job left in the standby; readers never see the standby.
        self.delete_all_documents()?;

        self.transition(RebuildState::Paging);
        let total = self.count_active(as_of)?;
        progress.total_items = total;
        progress.total_pages = page_count(total, self.config.page_size);
        debug!(total, pages = progress.total_pages, "Paging through active items");

        let mut locales = None;
        let mut page = 0usize;
        while (page as u64) * (self.config.page_size as u64) < total {
            if cancel.is_cancelled() {
                info!(page, "Rebuild cancelled before page");
                return Err(RebuildError::Cancelled);
            }
            let written = self.build_incremental_index(page, as_of, &mut locales, context.saved())?;
            progress.record_page(written);
            progress_callback.on_progress(progress);
            page += 1;
        }

        self.transition(RebuildState::Finalizing);
        let target = self.generations.reindex_generation();
        self.generations
            .optimize(target.as_ref())
            .map_err(RebuildError::RebuildFailed)?;

        if cancel.is_cancelled() {
            info!("Rebuild cancelled before swap");
            return Err(RebuildError::Cancelled);
        }

        self.transition(RebuildState::Swapping);
        let swapped = self.generations.swap().map_err(RebuildError::RebuildFailed)?;

        self.transition(RebuildState::Cleaning);
        if !shared {
            self.delete_all_documents()?;
        }
        Ok(swapped)
    }

    /// Clear the generation rebuilds write to.
    fn delete_all_documents(&self) -> Result<(), RebuildError> {
        let target = self.generations.reindex_generation();
        self.generations
            .clear_all(target.as_ref())
            .map_err(RebuildError::DeleteFailed)
    }

    fn count_active(&self, as_of: DateTime<Utc>) -> Result<u64, RebuildError> {
        let transaction = self.paginator.begin()?;
        match self.paginator.count(transaction.as_ref(), as_of) {
            Ok(total) => {
                finalize_transaction(transaction, false)?;
                Ok(total)
            }
            Err(e) => {
                rollback_quietly(transaction);
                Err(e.into())
            }
        }
    }

    /// Read, build and write one page inside its own transaction.
    fn build_incremental_index(
        &self,
        page: usize,
        as_of: DateTime<Utc>,
        locales: &mut Option<Vec<Locale>>,
        request: &RequestContext,
    ) -> Result<usize, RebuildError> {
        let started = Instant::now();
        let transaction = self.paginator.begin()?;

        match self.index_page(transaction.as_ref(), page, as_of, locales, request) {
            Ok(written) => {
                finalize_transaction(transaction, false)?;
                debug!(
                    page,
                    documents = written,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Built index page"
                );
                Ok(written)
            }
            Err(e) => {
                rollback_quietly(transaction);
                warn!(page, error = %e, "Rolled back index page");
                Err(e)
            }
        }
    }

    fn index_page(
        &self,
        transaction: &dyn Transaction,
        page: usize,
        as_of: DateTime<Utc>,
        locales: &mut Option<Vec<Locale>>,
        request: &RequestContext,
    ) -> Result<usize, RebuildError> {
        let items = self
            .paginator
            .page(transaction, page, self.config.page_size, as_of)?;
        let descriptors = self.collaborators.fields.searchable_field_descriptors()?;

        // Locales are read once per job
        if locales.is_none() {
            *locales = Some(self.collaborators.locales.all_locales()?);
        }
        let locales = locales.as_deref().unwrap_or_default();

        let documents = items
            .iter()
            .map(|item| self.builder.build(item, &descriptors, locales, request))
            .collect::<Result<Vec<IndexDocument>, _>>()?;
        for document in &documents {
            trace!(?document, "Built document");
        }

        let target = self.generations.reindex_generation();
        self.generations
            .write_batch(target.as_ref(), &documents)
            .map_err(RebuildError::RebuildFailed)
    }
}

fn rollback_quietly(transaction: Box<dyn Transaction>) {
    if let Err(e) = finalize_transaction(transaction, true) {
        warn!(error = %e, "Could not roll back rebuild transaction");
    }
}

/// Run a rebuild on Tokio's blocking pool.
pub fn spawn_rebuild<P>(
    orchestrator: Arc<RebuildOrchestrator>,
    cancel: CancellationToken,
    progress_callback: P,
) -> JoinHandle<Result<RebuildResult, RebuildError>>
where
    P: ProgressCallback + 'static,
{
    tokio::task::spawn_blocking(move || orchestrator.rebuild_index(&cancel, &progress_callback))
}

/// Run a rebuild on Tokio's blocking pool and wait for it.
pub async fn rebuild_in_background<P>(
    orchestrator: Arc<RebuildOrchestrator>,
    cancel: CancellationToken,
    progress_callback: P,
) -> Result<RebuildResult, RebuildError>
where
    P: ProgressCallback + 'static,
{
    spawn_rebuild(orchestrator, cancel, progress_callback)
        .await
        .map_err(|e| RebuildError::Task(e.to_string()))?
}
