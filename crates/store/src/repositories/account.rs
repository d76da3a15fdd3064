//! Account store with conditional balance writes.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tracing::{debug, info};

use greatbank_core::{Account, AccountStore, BalanceWrite, StoreError};
use greatbank_shared::types::{AccountId, AccountNumber, UserId};

use super::poisoned;

/// Accounts keyed by id, each behind its own lock.
///
/// Writers never hold a map shard across a balance update: the account's
/// `Arc` is cloned out first, then locked. Batches lock in ascending id
/// order.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    numbers: DashMap<AccountNumber, AccountId>,
}

impl MemoryAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the id or account number is taken, `NegativeBalance`
    /// if the opening balance is below zero.
    pub fn open_account(&self, account: Account) -> Result<AccountId, StoreError> {
        if account.balance < Decimal::ZERO {
            return Err(StoreError::NegativeBalance {
                account_id: account.id,
                resulting: account.balance,
            });
        }
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate {
                entity: "account",
                key: account.id.to_string(),
            });
        }

        let id = account.id;
        match self.numbers.entry(account.account_number.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Duplicate {
                    entity: "account number",
                    key: account.account_number.masked(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        info!(account_id = %id, number = %account.account_number.masked(), "account opened");
        self.accounts.insert(id, Arc::new(Mutex::new(account)));
        Ok(id)
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true when no account is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn cell(&self, account_id: AccountId) -> Result<Arc<Mutex<Account>>, StoreError> {
        self.accounts
            .get(&account_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::AccountNotFound(account_id))
    }
}

fn lock(cell: &Mutex<Account>) -> Result<MutexGuard<'_, Account>, StoreError> {
    cell.lock().map_err(poisoned)
}

/// Validates one write against the locked account without applying it.
fn check(account: &Account, write: &BalanceWrite) -> Result<Decimal, StoreError> {
    if account.balance != write.expected_balance {
        debug!(
            account_id = %account.id,
            expected = %write.expected_balance,
            actual = %account.balance,
            "stale balance"
        );
        return Err(StoreError::Conflict {
            account_id: account.id,
            expected: write.expected_balance,
            actual: account.balance,
        });
    }
    let Some(resulting) = account.balance.checked_add(write.delta) else {
        return Err(StoreError::Overflow {
            account_id: account.id,
            delta: write.delta,
        });
    };
    if resulting < Decimal::ZERO {
        return Err(StoreError::NegativeBalance {
            account_id: account.id,
            resulting,
        });
    }
    Ok(resulting)
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_account(&self, account_id: AccountId) -> Result<Account, StoreError> {
        let cell = self.cell(account_id)?;
        let account = lock(&cell)?;
        Ok(account.clone())
    }

    async fn get_balance(&self, account_id: AccountId) -> Result<Decimal, StoreError> {
        let cell = self.cell(account_id)?;
        let account = lock(&cell)?;
        Ok(account.balance)
    }

    async fn apply_balance_delta(
        &self,
        account_id: AccountId,
        delta: Decimal,
        expected_balance: Decimal,
    ) -> Result<Decimal, StoreError> {
        let cell = self.cell(account_id)?;
        let mut account = lock(&cell)?;
        let resulting = check(
            &account,
            &BalanceWrite::new(account_id, delta, expected_balance),
        )?;
        account.balance = resulting;
        Ok(resulting)
    }

    async fn apply_balance_deltas(
        &self,
        writes: Vec<BalanceWrite>,
    ) -> Result<Vec<Decimal>, StoreError> {
        let mut order: Vec<usize> = (0..writes.len()).collect();
        order.sort_by_key(|&i| writes[i].account_id);
        if let Some(pair) = order
            .windows(2)
            .find(|pair| writes[pair[0]].account_id == writes[pair[1]].account_id)
        {
            return Err(StoreError::Duplicate {
                entity: "balance write",
                key: writes[pair[0]].account_id.to_string(),
            });
        }

        let cells = order
            .iter()
            .map(|&i| self.cell(writes[i].account_id))
            .collect::<Result<Vec<_>, _>>()?;
        let mut guards = Vec::with_capacity(cells.len());
        for cell in &cells {
            guards.push(lock(cell)?);
        }

        let mut resulting = vec![Decimal::ZERO; writes.len()];
        for (guard, &i) in guards.iter().zip(&order) {
            resulting[i] = check(guard, &writes[i])?;
        }
        for (guard, &i) in guards.iter_mut().zip(&order) {
            guard.balance = resulting[i];
        }
        Ok(resulting)
    }

    async fn resolve_account_number(
        &self,
        account_number: &AccountNumber,
    ) -> Result<AccountId, StoreError> {
        self.numbers
            .get(account_number)
            .map(|entry| *entry.value())
            .ok_or_else(|| StoreError::AccountNumberNotFound(account_number.masked()))
    }

    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>, StoreError> {
        let cells: Vec<_> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut owned = Vec::new();
        for cell in &cells {
            let account = lock(cell)?;
            if account.owner_id == owner_id {
                owned.push(account.clone());
            }
        }
        owned.sort_by_key(|account| (account.created_at, account.id));
        Ok(owned)
    }
}
