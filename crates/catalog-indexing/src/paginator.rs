//! Paged reads of active catalog items.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use catalog_types::{CatalogError, CatalogItem};

use crate::collaborators::CatalogStore;
use crate::error::TransactionError;
use crate::transaction::{Transaction, TransactionDefinition, TransactionManager};

/// Name given to every transaction opened by a rebuild.
pub const REBUILD_TRANSACTION: &str = "rebuildIndex";

/// Reads the catalog page by page, each read inside a caller-owned transaction.
pub struct CatalogPaginator {
    catalog: Arc<dyn CatalogStore>,
    transactions: Arc<dyn TransactionManager>,
}

impl CatalogPaginator {
    pub fn new(catalog: Arc<dyn CatalogStore>, transactions: Arc<dyn TransactionManager>) -> Self {
        Self { catalog, transactions }
    }

    /// Open the read-only transaction for one read.
    pub fn begin(&self) -> Result<Box<dyn Transaction>, TransactionError> {
        self.transactions
            .begin(&TransactionDefinition::read_only(REBUILD_TRANSACTION))
    }

    pub fn count(&self, _transaction: &dyn Transaction, as_of: DateTime<Utc>) -> Result<u64, CatalogError> {
        let total = self.catalog.count_active(as_of)?;
        debug!(total, %as_of, "Counted active items");
        Ok(total)
    }

    pub fn page(
        &self,
        _transaction: &dyn Transaction,
        page: usize,
        page_size: usize,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.catalog.page_active(page, page_size, as_of)
    }
}

/// Number of pages needed to cover `total` items.
pub fn page_count(total: u64, page_size: usize) -> u64 {
    match page_size as u64 {
        0 => 0,
        size => total.div_ceil(size),
    }
}
