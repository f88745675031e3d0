//! Unit-of-work abstraction for catalog reads.
//!
//! Every page of a rebuild is read inside its own read-only transaction,
//! which the orchestrator commits or rolls back.

use tracing::debug;

use crate::error::TransactionError;

/// How a new transaction relates to one already in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Join the current transaction or start one
    #[default]
    Required,
    /// Always start a new transaction
    RequiresNew,
    /// Run inside a transaction only if one exists
    Supports,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDefinition {
    pub name: String,
    pub read_only: bool,
    pub propagation: Propagation,
}

impl TransactionDefinition {
    /// Read-only definition with `Required` propagation.
    pub fn read_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_only: true,
            propagation: Propagation::Required,
        }
    }
}

/// An open unit of work.
pub trait Transaction: Send {
    fn name(&self) -> &str;

    /// A transaction marked rollback-only is left to its owner to finish.
    fn is_rollback_only(&self) -> bool {
        false
    }

    fn commit(self: Box<Self>) -> Result<(), TransactionError>;

    fn rollback(self: Box<Self>) -> Result<(), TransactionError>;
}

/// Begins transactions for catalog reads.
pub trait TransactionManager: Send + Sync {
    fn begin(&self, definition: &TransactionDefinition) -> Result<Box<dyn Transaction>, TransactionError>;
}

/// Commit or roll back, unless the transaction is rollback-only.
pub fn finalize_transaction(transaction: Box<dyn Transaction>, is_error: bool) -> Result<(), TransactionError> {
    if transaction.is_rollback_only() {
        debug!(name = transaction.name(), "Transaction is rollback-only, leaving it untouched");
        return Ok(());
    }
    if is_error {
        transaction.rollback()
    } else {
        transaction.commit()
    }
}

/// Transaction manager for stores without transactional reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransactionManager;

struct NoopTransaction {
    name: String,
}

impl Transaction for NoopTransaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        Ok(())
    }
}

impl TransactionManager for NoopTransactionManager {
    fn begin(&self, definition: &TransactionDefinition) -> Result<Box<dyn Transaction>, TransactionError> {
        Ok(Box::new(NoopTransaction {
            name: definition.name.clone(),
        }))
    }
}
