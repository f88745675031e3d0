//! Failure path E2E tests.
//!
//! Engine failures abort the rebuild with a wrapped error and never swap;
//! catalog and transaction failures come back unchanged. In every case the
//! page transaction is rolled back and the active generation keeps serving
//! the documents it had.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use catalog_indexing::{
    CatalogStore, ExtensionManager, NoOpProgressCallback, ProgressCallback, RebuildConfig, RebuildError,
    RebuildOrchestrator, RebuildProgress, RebuildState, REBUILD_TRANSACTION,
};
use catalog_search::GenerationManager;
use catalog_types::{CatalogError, CatalogItem, GenerationMode};
use e2e_tests::{
    create_sauces, identity_document, operations, seed, FaultyGeneration, OperationLog, TestHarness,
    TransactionEvent,
};

fn seeded_primary(harness: &TestHarness, log: &OperationLog) -> FaultyGeneration {
    let primary = harness.tantivy_generation("primary");
    seed(
        primary.as_ref(),
        &(100..103).map(|id| identity_document("d", id)).collect::<Vec<_>>(),
    );
    FaultyGeneration::new(primary, log.clone())
}

#[test]
fn test_second_of_three_pages_fails() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(9));
    let log = OperationLog::default();
    let primary = seeded_primary(&harness, &log);
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone()).failing_add_on_call(2);
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));
    let orchestrator = harness.orchestrator(generations.clone(), 3);

    let err = orchestrator
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap_err();

    assert!(matches!(err, RebuildError::RebuildFailed(_)));
    assert!(
        err.to_string().starts_with("Could not rebuild index"),
        "unexpected message: {}",
        err
    );
    assert_eq!(orchestrator.state(), RebuildState::Failed);

    // No swap, and the active generation still serves the old documents
    assert_eq!(generations.active().name(), "primary");
    assert_eq!(generations.active().num_docs().unwrap(), 3);

    // Page three is never attempted
    assert_eq!(
        operations(&log),
        vec![
            "reindex:delete_by_query(*:*)",
            "reindex:commit",
            "reindex:add",
            "reindex:commit",
            "reindex:add",
            "reindex:rollback",
        ]
    );

    let tx = REBUILD_TRANSACTION.to_string();
    assert_eq!(
        harness.transactions.events(),
        vec![
            TransactionEvent::Begin(tx.clone()),
            TransactionEvent::Commit(tx.clone()),
            TransactionEvent::Begin(tx.clone()),
            TransactionEvent::Commit(tx.clone()),
            TransactionEvent::Begin(tx.clone()),
            TransactionEvent::Rollback(tx),
        ]
    );
}

#[test]
fn test_shared_clear_failure_stops_before_paging() {
    let harness = TestHarness::with_mode(GenerationMode::Shared);
    harness.stock(create_sauces(4));
    let log = OperationLog::default();
    let only = FaultyGeneration::new(harness.tantivy_generation("only"), log.clone()).failing_delete();
    let generations = Arc::new(GenerationManager::shared(Arc::new(only)));

    let err = harness
        .orchestrator(generations, 2)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap_err();

    assert!(matches!(err, RebuildError::DeleteFailed(_)));
    assert!(err.to_string().starts_with("Could not delete documents"));
    assert_eq!(operations(&log), vec!["only:delete_by_query(*:*)"]);
    assert!(harness.transactions.events().is_empty());
}

#[test]
fn test_dual_clear_failure_after_swap() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(4));
    let log = OperationLog::default();
    let primary = seeded_primary(&harness, &log).failing_delete();
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone());
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));

    let err = harness
        .orchestrator(generations.clone(), 10)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap_err();

    // The swap already happened; only the cleanup failed
    assert!(matches!(err, RebuildError::DeleteFailed(_)));
    assert_eq!(generations.active().name(), "reindex");
    assert_eq!(generations.active().num_docs().unwrap(), 4);
}

#[test]
fn test_optimize_failure_prevents_swap() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(4));
    let log = OperationLog::default();
    let primary = seeded_primary(&harness, &log);
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone()).failing_optimize();
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));

    let err = harness
        .orchestrator(generations.clone(), 10)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap_err();

    assert!(matches!(err, RebuildError::RebuildFailed(_)));
    assert_eq!(generations.active().name(), "primary");
    assert_eq!(generations.active().num_docs().unwrap(), 3);
}

/// Catalog whose second page read fails.
struct BrokenCatalog;

impl CatalogStore for BrokenCatalog {
    fn count_active(&self, _as_of: DateTime<Utc>) -> Result<u64, CatalogError> {
        Ok(6)
    }

    fn page_active(&self, page: usize, page_size: usize, _as_of: DateTime<Utc>) -> Result<Vec<CatalogItem>, CatalogError> {
        if page == 1 {
            return Err(CatalogError::Storage("catalog connection lost".to_string()));
        }
        Ok((0..page_size as i64).map(|i| CatalogItem::new(i + 1)).collect())
    }
}

#[test]
fn test_catalog_error_returned_unchanged() {
    let harness = TestHarness::new();
    let mut collaborators = harness.collaborators();
    collaborators.catalog = Arc::new(BrokenCatalog);
    let generations = harness.open_generations();
    let orchestrator = RebuildOrchestrator::new(
        RebuildConfig::default().with_page_size(3),
        collaborators,
        generations.clone(),
        ExtensionManager::new(),
    )
    .unwrap();

    let err = orchestrator
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap_err();

    match err {
        RebuildError::Catalog(CatalogError::Storage(message)) => {
            assert_eq!(message, "catalog connection lost")
        }
        other => panic!("expected catalog error, got {:?}", other),
    }
    assert_eq!(
        harness
            .transactions
            .count(|e| matches!(e, TransactionEvent::Rollback(_))),
        1
    );
    assert_eq!(generations.active().name(), "primary");
}

#[test]
fn test_rollback_only_transactions_left_alone() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(4));
    harness.transactions.set_rollback_only(true);

    let generations = harness.open_generations();
    harness
        .orchestrator(generations.clone(), 2)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap();

    let events = harness.transactions.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| matches!(e, TransactionEvent::Begin(_))));
    assert_eq!(generations.active().num_docs().unwrap(), 4);
}

/// Cancels the job once a number of pages have been committed.
struct CancelAfter {
    token: CancellationToken,
    pages: u64,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, progress: &RebuildProgress) {
        if progress.pages_processed >= self.pages {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancellation_between_pages() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(9));
    let log = OperationLog::default();
    let primary = seeded_primary(&harness, &log);
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone());
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));
    let orchestrator = harness.orchestrator(generations.clone(), 3);

    let token = CancellationToken::new();
    let callback = CancelAfter {
        token: token.clone(),
        pages: 1,
    };
    let err = orchestrator.rebuild_index(&token, &callback).unwrap_err();

    assert!(matches!(err, RebuildError::Cancelled));
    assert_eq!(
        operations(&log),
        vec![
            "reindex:delete_by_query(*:*)",
            "reindex:commit",
            "reindex:add",
            "reindex:commit",
        ]
    );
    assert_eq!(generations.active().name(), "primary");
    assert!(!orchestrator.is_running());
}

#[test]
fn test_standby_clear_failure_leaves_active_untouched() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(4));
    let log = OperationLog::default();
    let primary = seeded_primary(&harness, &log);
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone()).failing_delete();
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));

    let err = harness
        .orchestrator(generations.clone(), 2)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap_err();

    assert!(matches!(err, RebuildError::DeleteFailed(_)));
    assert_eq!(operations(&log), vec!["reindex:delete_by_query(*:*)"]);
    assert!(harness.transactions.events().is_empty());
    assert_eq!(generations.active().name(), "primary");
    assert_eq!(generations.active().num_docs().unwrap(), 3);
}

#[test]
fn test_cancelled_job_leaves_nothing_for_next_swap() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(4));
    let generations = harness.open_generations();
    let orchestrator = harness.orchestrator(generations.clone(), 2);

    let token = CancellationToken::new();
    let callback = CancelAfter {
        token: token.clone(),
        pages: 1,
    };
    let err = orchestrator.rebuild_index(&token, &callback).unwrap_err();
    assert!(matches!(err, RebuildError::Cancelled));
    // Page one was committed to the standby
    assert_eq!(generations.reindex_generation().num_docs().unwrap(), 2);

    // Item 1 leaves the catalog before the next job
    let retired = Utc::now() - chrono::Duration::days(1);
    harness
        .catalog
        .upsert(CatalogItem::new(1).with_active_window(None, Some(retired)))
        .unwrap();

    orchestrator
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap();

    let active = generations.active();
    assert_eq!(active.name(), "reindex");
    assert!(active.get("d_1").unwrap().is_none());
    assert_eq!(active.num_docs().unwrap(), 3);
}
