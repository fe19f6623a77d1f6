//! Account storage.
//!
//! The store is a plain keyed container. It does no concurrency control
//! beyond keeping its map consistent; who may mutate which account is decided
//! by the [`LockTable`](crate::LockTable).

use crate::error::{CoreError, CoreResult};
use crate::types::{AccountId, Balance};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Account identity.
    pub id: AccountId,
    /// Current balance.
    pub balance: Balance,
}

/// Balances of every account plus their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    /// Accounts in id order.
    pub accounts: Vec<Account>,
    /// Sum of all balances.
    pub total: i128,
}

/// Keyed container of account balances.
#[derive(Debug)]
pub struct AccountStore {
    accounts: RwLock<BTreeMap<AccountId, Balance>>,
}

impl AccountStore {
    /// Creates `count` accounts numbered `1..=count`, each holding `initial_balance`.
    pub fn new(count: u32, initial_balance: Balance) -> Self {
        let accounts = (1..=count)
            .map(|id| (AccountId::new(id), initial_balance))
            .collect();
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    /// Returns the number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Returns true if the store holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Returns true if the account exists.
    #[must_use]
    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.read().contains_key(&id)
    }

    /// Returns the balance of an account.
    pub fn balance(&self, id: AccountId) -> CoreResult<Balance> {
        self.accounts
            .read()
            .get(&id)
            .copied()
            .ok_or(CoreError::AccountNotFound(id))
    }

    /// Overwrites the balance of an existing account.
    pub fn set_balance(&self, id: AccountId, balance: Balance) -> CoreResult<()> {
        match self.accounts.write().get_mut(&id) {
            Some(slot) => {
                *slot = balance;
                Ok(())
            }
            None => Err(CoreError::AccountNotFound(id)),
        }
    }

    /// Returns every account in id order together with the total.
    #[must_use]
    pub fn report(&self) -> AccountReport {
        let accounts: Vec<Account> = self
            .accounts
            .read()
            .iter()
            .map(|(&id, &balance)| Account { id, balance })
            .collect();
        let total = accounts.iter().map(|a| i128::from(a.balance)).sum();
        AccountReport { accounts, total }
    }
}
