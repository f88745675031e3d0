//! End-to-end test infrastructure for catalog search rebuilds.
//!
//! Provides a shared TestHarness with on-disk Tantivy generations, an
//! in-memory catalog, a recording transaction manager and a generation
//! wrapper that injects failures and records every engine call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use catalog_indexing::{
    ExtensionManager, InMemoryCatalog, RebuildCollaborators, RebuildConfig, RebuildOrchestrator,
    SharedRequestContext, StaticFieldRegistry, StaticLocaleDirectory, Transaction, TransactionDefinition,
    TransactionError, TransactionManager, TranslationExtension,
};
use catalog_search::{GenerationConfig, GenerationManager, IndexGeneration, SearchError, TantivyGeneration};
use catalog_types::{
    AttributeValue, CatalogItem, Category, FieldDescriptor, FieldType, GenerationMode, IndexDocument, ItemId,
    Locale, Settings, ID_FIELD, ITEM_ID_FIELD, NAMESPACE_FIELD,
};

/// Shared test harness for E2E tests.
///
/// Owns the temp directory holding the index generations plus the
/// collaborators every rebuild reads from.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub settings: Settings,
    pub catalog: Arc<InMemoryCatalog>,
    pub transactions: Arc<RecordingTransactionManager>,
    pub context: Arc<SharedRequestContext>,
    pub descriptors: Vec<FieldDescriptor>,
    pub locales: Vec<Locale>,
}

impl TestHarness {
    /// Harness with dual generations and an empty catalog.
    pub fn new() -> Self {
        Self::with_mode(GenerationMode::Dual)
    }

    pub fn with_mode(generation_mode: GenerationMode) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let settings = Settings {
            index_root: temp_dir.path().to_string_lossy().to_string(),
            generation_mode,
            ..Default::default()
        };

        Self {
            _temp_dir: temp_dir,
            settings,
            catalog: Arc::new(InMemoryCatalog::default()),
            transactions: Arc::new(RecordingTransactionManager::default()),
            context: Arc::new(SharedRequestContext::default()),
            descriptors: sauce_descriptors(),
            locales: vec![Locale::new("en_US").as_default(), Locale::new("es_ES")],
        }
    }

    /// Add items to the catalog.
    pub fn stock(&self, items: impl IntoIterator<Item = CatalogItem>) {
        for item in items {
            self.catalog.upsert(item).expect("Failed to add catalog item");
        }
    }

    /// Open the Tantivy generations under the harness index root.
    pub fn open_generations(&self) -> Arc<GenerationManager> {
        Arc::new(GenerationManager::open(&self.settings).expect("Failed to open generations"))
    }

    /// Open a standalone Tantivy generation under the harness index root.
    pub fn tantivy_generation(&self, name: &str) -> Arc<dyn IndexGeneration> {
        let config = GenerationConfig::new(name, self._temp_dir.path().join(name));
        Arc::new(TantivyGeneration::open(&config).expect("Failed to open generation"))
    }

    pub fn collaborators(&self) -> RebuildCollaborators {
        RebuildCollaborators {
            catalog: self.catalog.clone(),
            fields: Arc::new(StaticFieldRegistry::new(self.descriptors.clone())),
            locales: Arc::new(StaticLocaleDirectory::new(self.locales.clone())),
            transactions: self.transactions.clone(),
            context: self.context.clone(),
        }
    }

    /// Orchestrator with the translation extension registered.
    pub fn orchestrator(&self, generations: Arc<GenerationManager>, page_size: usize) -> RebuildOrchestrator {
        let extensions = ExtensionManager::new().with_handler(Arc::new(TranslationExtension));
        RebuildOrchestrator::new(
            RebuildConfig::from_settings(&self.settings).with_page_size(page_size),
            self.collaborators(),
            generations,
            extensions,
        )
        .expect("Failed to create orchestrator")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptors used by most scenarios.
///
/// `name` is searchable text with a string facet, `description` is
/// localized text, `color` comes from the mapped attribute list and is
/// both searched and faceted as a string.
pub fn sauce_descriptors() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("name", "name")
            .searchable_as([FieldType::Text])
            .with_facet(FieldType::String),
        FieldDescriptor::new("description", "description").searchable_as([FieldType::Text]),
        FieldDescriptor::new("productAttributes.color", "color")
            .searchable_as([FieldType::String])
            .with_facet(FieldType::String),
        FieldDescriptor::new("price", "price").with_facet(FieldType::Price),
    ]
}

/// A small category tree with a shared ancestor.
///
/// `Hot` and `Gifts` both sit under `Sauces`, which sits under `Root`.
pub fn category_tree() -> (Arc<Category>, Arc<Category>) {
    let root = Arc::new(Category::new(1, "Root"));
    let sauces = Arc::new(Category::new(2, "Sauces").with_parent(root));
    let hot = Arc::new(Category::new(3, "Hot").with_parent(sauces.clone()).with_items(1..=20));
    let gifts = Arc::new(Category::new(4, "Gifts").with_parent(sauces).with_items([5, 3]));
    (hot, gifts)
}

/// Items `1..=count` with a name, price, color and both translations.
pub fn create_sauces(count: i64) -> Vec<CatalogItem> {
    let (hot, gifts) = category_tree();
    let colors = ["red", "green", "orange"];

    (1..=count)
        .map(|id| {
            let color = colors[(id as usize) % colors.len()];
            let mut item = CatalogItem::new(id)
                .with_category(hot.clone())
                .with_attribute("name", format!("Sauce {}", id))
                .with_attribute("price", 4.5 + id as f64)
                .with_attribute(
                    "productAttributes",
                    AttributeValue::List(vec![AttributeValue::object([("name", "color"), ("value", color)])]),
                )
                .with_translation("description", "en_US", format!("Hot sauce number {}", id))
                .with_translation("description", "es_ES", format!("Salsa picante número {}", id));
            if id % 5 == 0 {
                item = item.with_category(gifts.clone());
            }
            item
        })
        .collect()
}

/// Minimal document for an item, as left behind by an earlier rebuild.
pub fn identity_document(namespace: &str, item_id: ItemId) -> IndexDocument {
    let mut document = IndexDocument::new();
    document.add_field(NAMESPACE_FIELD, namespace);
    document.add_field(ID_FIELD, format!("{}_{}", namespace, item_id));
    document.add_field(ITEM_ID_FIELD, item_id);
    document
}

/// Commit documents straight into a generation.
pub fn seed(generation: &dyn IndexGeneration, documents: &[IndexDocument]) {
    generation.add(documents).expect("Failed to seed generation");
    generation.commit().expect("Failed to commit seeded generation");
}

/// Transaction lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin(String),
    Commit(String),
    Rollback(String),
}

/// Transaction manager that records every begin, commit and rollback.
#[derive(Debug, Default)]
pub struct RecordingTransactionManager {
    events: Arc<Mutex<Vec<TransactionEvent>>>,
    definitions: Mutex<Vec<TransactionDefinition>>,
    rollback_only: AtomicBool,
}

impl RecordingTransactionManager {
    pub fn events(&self) -> Vec<TransactionEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn definitions(&self) -> Vec<TransactionDefinition> {
        self.definitions.lock().expect("definitions lock").clone()
    }

    /// Mark every transaction begun from now on as rollback-only.
    pub fn set_rollback_only(&self, rollback_only: bool) {
        self.rollback_only.store(rollback_only, Ordering::SeqCst);
    }

    pub fn count(&self, matches: impl Fn(&TransactionEvent) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }
}

struct RecordingTransaction {
    name: String,
    rollback_only: bool,
    events: Arc<Mutex<Vec<TransactionEvent>>>,
}

impl RecordingTransaction {
    fn record(&self, event: TransactionEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl Transaction for RecordingTransaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        self.record(TransactionEvent::Commit(self.name.clone()));
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        self.record(TransactionEvent::Rollback(self.name.clone()));
        Ok(())
    }
}

impl TransactionManager for RecordingTransactionManager {
    fn begin(&self, definition: &TransactionDefinition) -> Result<Box<dyn Transaction>, TransactionError> {
        self.definitions.lock().expect("definitions lock").push(definition.clone());
        self.events
            .lock()
            .expect("events lock")
            .push(TransactionEvent::Begin(definition.name.clone()));
        Ok(Box::new(RecordingTransaction {
            name: definition.name.clone(),
            rollback_only: self.rollback_only.load(Ordering::SeqCst),
            events: self.events.clone(),
        }))
    }
}

/// Shared, ordered log of engine calls across generations.
pub type OperationLog = Arc<Mutex<Vec<String>>>;

/// Generation wrapper that records calls and fails on demand.
pub struct FaultyGeneration {
    inner: Arc<dyn IndexGeneration>,
    log: OperationLog,
    add_calls: AtomicUsize,
    fail_add_on_call: Option<usize>,
    fail_delete: bool,
    fail_optimize: bool,
}

impl FaultyGeneration {
    pub fn new(inner: Arc<dyn IndexGeneration>, log: OperationLog) -> Self {
        Self {
            inner,
            log,
            add_calls: AtomicUsize::new(0),
            fail_add_on_call: None,
            fail_delete: false,
            fail_optimize: false,
        }
    }

    /// Fail the `call`-th add (1-based).
    pub fn failing_add_on_call(mut self, call: usize) -> Self {
        self.fail_add_on_call = Some(call);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn failing_optimize(mut self) -> Self {
        self.fail_optimize = true;
        self
    }

    fn record(&self, operation: &str) {
        self.log
            .lock()
            .expect("operation log lock")
            .push(format!("{}:{}", self.inner.name(), operation));
    }
}

impl IndexGeneration for FaultyGeneration {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn add(&self, documents: &[IndexDocument]) -> Result<(), SearchError> {
        let call = self.add_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.record("add");
        if self.fail_add_on_call == Some(call) {
            return Err(SearchError::Communication(format!("connection reset on add #{}", call)));
        }
        self.inner.add(documents)
    }

    fn commit(&self) -> Result<(), SearchError> {
        self.record("commit");
        self.inner.commit()
    }

    fn rollback(&self) -> Result<(), SearchError> {
        self.record("rollback");
        self.inner.rollback()
    }

    fn optimize(&self) -> Result<(), SearchError> {
        self.record("optimize");
        if self.fail_optimize {
            return Err(SearchError::Communication("optimize timed out".to_string()));
        }
        self.inner.optimize()
    }

    fn delete_by_query(&self, query: &str) -> Result<(), SearchError> {
        self.record(&format!("delete_by_query({})", query));
        if self.fail_delete {
            return Err(SearchError::Rejected("delete refused".to_string()));
        }
        self.inner.delete_by_query(query)
    }

    fn num_docs(&self) -> Result<u64, SearchError> {
        self.inner.num_docs()
    }

    fn get(&self, doc_id: &str) -> Result<Option<IndexDocument>, SearchError> {
        self.inner.get(doc_id)
    }
}

/// Snapshot of an operation log.
pub fn operations(log: &OperationLog) -> Vec<String> {
    log.lock().expect("operation log lock").clone()
}
