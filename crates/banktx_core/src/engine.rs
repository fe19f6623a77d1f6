//! Transaction engine.
//!
//! The engine ties the account store, the lock table and the transaction
//! registry together and owns the commit and abort sequences:
//!
//! - commit releases every lock, then files the transaction as committed;
//! - abort restores the before-image while the locks are still held, then
//!   releases them and files the transaction as aborted.

use crate::account::{AccountReport, AccountStore};
use crate::error::CoreResult;
use crate::lock::LockTable;
use crate::manager::AccountManager;
use crate::transaction::{Transaction, TransactionRegistry};
use crate::types::{AccountId, Balance, TransactionId};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared transactional state of a server.
#[derive(Debug)]
pub struct Engine {
    accounts: Arc<AccountStore>,
    locks: Arc<LockTable>,
    registry: TransactionRegistry,
    manager: AccountManager,
}

impl Engine {
    /// Creates an engine with `number_of_accounts` accounts, each holding
    /// `initial_balance`.
    pub fn new(number_of_accounts: u32, initial_balance: Balance) -> Self {
        let accounts = Arc::new(AccountStore::new(number_of_accounts, initial_balance));
        let locks = Arc::new(LockTable::new());
        let manager = AccountManager::new(Arc::clone(&accounts), Arc::clone(&locks));
        Self {
            accounts,
            locks,
            registry: TransactionRegistry::new(),
            manager,
        }
    }

    /// Opens a new transaction.
    pub fn open(&self) -> Transaction {
        let txn = self.registry.open();
        info!(txn = %txn.id(), "transaction opened");
        txn
    }

    /// Reads an account on behalf of `txn`.
    pub fn read(&self, txn: &mut Transaction, account: AccountId) -> CoreResult<Balance> {
        self.manager.read(account, txn)
    }

    /// Writes an account on behalf of `txn`.
    pub fn write(
        &self,
        txn: &mut Transaction,
        account: AccountId,
        balance: Balance,
    ) -> CoreResult<()> {
        self.manager.write(account, balance, txn)
    }

    /// Commits `txn`: releases its locks and files it as committed.
    pub fn commit(&self, mut txn: Transaction) -> CoreResult<TransactionId> {
        txn.ensure_active()?;
        let id = txn.id();

        let released = self.locks.release(&mut txn);
        txn.mark_committed();
        info!(txn = %id, locks = released, "transaction committed");
        debug!(txn = %id, "transaction log:\n{}", txn.log());

        self.registry.file(txn)?;
        Ok(id)
    }

    /// Aborts `txn`: restores its before-image, releases its locks and files
    /// it as aborted.
    pub fn abort(&self, mut txn: Transaction) -> CoreResult<TransactionId> {
        txn.ensure_active()?;
        let id = txn.id();

        let restored = self.manager.rollback(&mut txn)?;
        let released = self.locks.release(&mut txn);
        txn.mark_aborted();
        info!(txn = %id, restored, locks = released, "transaction aborted");
        debug!(txn = %id, "transaction log:\n{}", txn.log());

        self.registry.file(txn)?;
        Ok(id)
    }

    /// Returns every balance and their sum.
    #[must_use]
    pub fn report(&self) -> AccountReport {
        self.accounts.report()
    }

    /// Returns the account store.
    #[must_use]
    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    /// Returns the lock table.
    #[must_use]
    pub fn locks(&self) -> &Arc<LockTable> {
        &self.locks
    }

    /// Returns the transaction registry.
    #[must_use]
    pub fn registry(&self) -> &TransactionRegistry {
        &self.registry
    }
}
