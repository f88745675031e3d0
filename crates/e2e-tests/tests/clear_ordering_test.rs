//! Ordering of engine calls in shared and dual generation modes.
//!
//! Both modes clear the generation being rebuilt before the first page.
//! Dual mode never touches the active generation until the swap, then
//! clears the demoted one.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use catalog_indexing::NoOpProgressCallback;
use catalog_search::GenerationManager;
use e2e_tests::{create_sauces, operations, FaultyGeneration, OperationLog, TestHarness};

#[test]
fn test_shared_mode_clears_before_paging() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(5));
    let log = OperationLog::default();
    let only = FaultyGeneration::new(harness.tantivy_generation("only"), log.clone());
    let generations = Arc::new(GenerationManager::shared(Arc::new(only)));

    let result = harness
        .orchestrator(generations.clone(), 3)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap();

    assert!(!result.swapped);
    assert_eq!(
        operations(&log),
        vec![
            "only:delete_by_query(*:*)",
            "only:commit",
            "only:add",
            "only:commit",
            "only:add",
            "only:commit",
            "only:optimize",
        ]
    );
    assert_eq!(generations.active().num_docs().unwrap(), 5);
}

#[test]
fn test_dual_mode_clears_demoted_generation_last() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(5));
    let log = OperationLog::default();
    let primary = FaultyGeneration::new(harness.tantivy_generation("primary"), log.clone());
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone());
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));

    let result = harness
        .orchestrator(generations.clone(), 3)
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap();

    assert!(result.swapped);
    assert_eq!(
        operations(&log),
        vec![
            "reindex:delete_by_query(*:*)",
            "reindex:commit",
            "reindex:add",
            "reindex:commit",
            "reindex:add",
            "reindex:commit",
            "reindex:optimize",
            "primary:delete_by_query(*:*)",
            "primary:commit",
        ]
    );
    assert_eq!(generations.active().name(), "reindex");
    assert_eq!(generations.active().num_docs().unwrap(), 5);
}

#[test]
fn test_dual_mode_alternates_generations() {
    let harness = TestHarness::new();
    harness.stock(create_sauces(2));
    let log = OperationLog::default();
    let primary = FaultyGeneration::new(harness.tantivy_generation("primary"), log.clone());
    let reindex = FaultyGeneration::new(harness.tantivy_generation("reindex"), log.clone());
    let generations = Arc::new(GenerationManager::dual(Arc::new(primary), Arc::new(reindex)));
    let orchestrator = harness.orchestrator(generations.clone(), 10);

    orchestrator
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap();
    log.lock().unwrap().clear();
    orchestrator
        .rebuild_index(&CancellationToken::new(), &NoOpProgressCallback)
        .unwrap();

    assert_eq!(
        operations(&log),
        vec![
            "primary:delete_by_query(*:*)",
            "primary:commit",
            "primary:add",
            "primary:commit",
            "primary:optimize",
            "reindex:delete_by_query(*:*)",
            "reindex:commit",
        ]
    );
    assert_eq!(generations.active().name(), "primary");
}
