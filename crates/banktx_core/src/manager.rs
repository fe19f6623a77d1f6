//! Account manager.

use crate::account::AccountStore;
use crate::error::{CoreError, CoreResult};
use crate::lock::{LockMode, LockTable};
use crate::transaction::{Transaction, TxnEventKind};
use crate::types::{AccountId, Balance};
use std::sync::Arc;
use tracing::warn;

/// Mediates every transactional account access.
///
/// Each access takes the appropriate lock first, then records a before-image
/// on the transaction, and only then touches the store.
#[derive(Debug, Clone)]
pub struct AccountManager {
    accounts: Arc<AccountStore>,
    locks: Arc<LockTable>,
}

impl AccountManager {
    /// Creates a manager over a store and its lock table.
    pub fn new(accounts: Arc<AccountStore>, locks: Arc<LockTable>) -> Self {
        Self { accounts, locks }
    }

    /// Reads a balance under a READ lock.
    ///
    /// Unknown accounts fail with [`CoreError::AccountNotFound`] before any
    /// lock is taken.
    pub fn read(&self, account: AccountId, txn: &mut Transaction) -> CoreResult<Balance> {
        self.ensure_exists(account, txn)?;
        self.locks.acquire(txn, account, LockMode::Read)?;

        let balance = self.accounts.balance(account)?;
        txn.add_before_image(account, balance);
        txn.record(TxnEventKind::Read { account, balance });
        Ok(balance)
    }

    /// Overwrites a balance under a WRITE lock.
    pub fn write(
        &self,
        account: AccountId,
        balance: Balance,
        txn: &mut Transaction,
    ) -> CoreResult<()> {
        self.ensure_exists(account, txn)?;
        self.locks.acquire(txn, account, LockMode::Write)?;

        let before = self.accounts.balance(account)?;
        txn.add_before_image(account, before);
        self.accounts.set_balance(account, balance)?;
        txn.record(TxnEventKind::Wrote { account, balance });
        Ok(())
    }

    /// Restores every account in the transaction's before-image.
    ///
    /// Must run while the transaction still holds its locks. Returns the
    /// number of accounts restored.
    pub fn rollback(&self, txn: &mut Transaction) -> CoreResult<usize> {
        let image: Vec<(AccountId, Balance)> =
            txn.before_image().iter().map(|(&a, &b)| (a, b)).collect();
        for &(account, balance) in &image {
            self.accounts.set_balance(account, balance)?;
            txn.record(TxnEventKind::RolledBack { account, balance });
        }
        Ok(image.len())
    }

    fn ensure_exists(&self, account: AccountId, txn: &Transaction) -> CoreResult<()> {
        if self.accounts.contains(account) {
            Ok(())
        } else {
            warn!(txn = %txn.id(), %account, "account does not exist");
            Err(CoreError::AccountNotFound(account))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionRegistry;
    use proptest::prelude::*;

    fn setup(accounts: u32, balance: Balance) -> (AccountManager, Arc<AccountStore>, Arc<LockTable>) {
        let store = Arc::new(AccountStore::new(accounts, balance));
        let locks = Arc::new(LockTable::new());
        let manager = AccountManager::new(Arc::clone(&store), Arc::clone(&locks));
        (manager, store, locks)
    }

    #[test]
    fn read_takes_read_lock_and_records_image() {
        let (manager, _store, locks) = setup(2, 10);
        let registry = TransactionRegistry::new();
        let mut txn = registry.open();

        assert_eq!(manager.read(AccountId::new(1), &mut txn).unwrap(), 10);

        let snap = locks.snapshot(AccountId::new(1)).unwrap();
        assert_eq!(snap.mode, LockMode::Read);
        assert_eq!(txn.before_image().get(&AccountId::new(1)), Some(&10));
    }

    #[test]
    fn write_promotes_and_mutates() {
        let (manager, store, locks) = setup(2, 10);
        let registry = TransactionRegistry::new();
        let mut txn = registry.open();

        manager.read(AccountId::new(1), &mut txn).unwrap();
        manager.write(AccountId::new(1), 5, &mut txn).unwrap();

        assert_eq!(store.balance(AccountId::new(1)).unwrap(), 5);
        let snap = locks.snapshot(AccountId::new(1)).unwrap();
        assert_eq!(snap.mode, LockMode::Write);
        assert_eq!(snap.holders, vec![txn.id()]);
        assert_eq!(txn.locks().len(), 1);
    }

    #[test]
    fn unknown_account_takes_no_lock() {
        let (manager, _store, locks) = setup(2, 10);
        let registry = TransactionRegistry::new();
        let mut txn = registry.open();

        assert!(manager.read(AccountId::new(7), &mut txn).unwrap_err().is_not_found());
        assert!(manager
            .write(AccountId::new(7), 1, &mut txn)
            .unwrap_err()
            .is_not_found());
        assert!(locks.is_empty());
        assert!(txn.is_active());
    }

    #[test]
    fn rollback_restores_first_image() {
        let (manager, store, _locks) = setup(2, 10);
        let registry = TransactionRegistry::new();
        let mut txn = registry.open();

        manager.write(AccountId::new(1), 3, &mut txn).unwrap();
        manager.write(AccountId::new(1), 8, &mut txn).unwrap();
        manager.write(AccountId::new(2), 20, &mut txn).unwrap();

        assert_eq!(manager.rollback(&mut txn).unwrap(), 2);
        assert_eq!(store.balance(AccountId::new(1)).unwrap(), 10);
        assert_eq!(store.balance(AccountId::new(2)).unwrap(), 10);
    }

    proptest! {
        #[test]
        fn rollback_is_exact_for_any_write_sequence(
            writes in prop::collection::vec((1u32..5, -1000i64..1000), 0..30)
        ) {
            let (manager, store, _locks) = setup(4, 50);
            let before = store.report();
            let registry = TransactionRegistry::new();
            let mut txn = registry.open();

            for (account, balance) in &writes {
                manager.write(AccountId::new(*account), *balance, &mut txn).unwrap();
            }
            manager.rollback(&mut txn).unwrap();

            prop_assert_eq!(store.report(), before);
        }
    }
}
