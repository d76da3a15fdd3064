//! Store ports.
//!
//! The engine reaches persistence only through these traits. Implementations
//! live outside this crate and are injected into [`LedgerEngine`] as `Arc`s,
//! so the composing application owns their lifecycle.
//!
//! [`LedgerEngine`]: crate::ledger::LedgerEngine

mod error;

use async_trait::async_trait;
use rust_decimal::Decimal;

use greatbank_shared::types::{AccountId, AccountNumber, HoldingId, TransactionId, UserId};

use crate::account::Account;
use crate::investment::Holding;
use crate::ledger::{TransactionQuery, TransactionRecord};

pub use error::StoreError;

/// One leg of a multi-account conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceWrite {
    /// Account to update.
    pub account_id: AccountId,
    /// Signed change to apply.
    pub delta: Decimal,
    /// Balance the caller observed before computing `delta`.
    pub expected_balance: Decimal,
}

impl BalanceWrite {
    /// Creates a write.
    #[must_use]
    pub const fn new(account_id: AccountId, delta: Decimal, expected_balance: Decimal) -> Self {
        Self {
            account_id,
            delta,
            expected_balance,
        }
    }
}

/// Authoritative current balance per account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Loads the full account.
    async fn get_account(&self, account_id: AccountId) -> Result<Account, StoreError>;

    /// Reads the current balance.
    async fn get_balance(&self, account_id: AccountId) -> Result<Decimal, StoreError>;

    /// Conditional write: applies `delta` only if the stored balance still
    /// equals `expected_balance`, otherwise fails with [`StoreError::Conflict`].
    ///
    /// Returns the new balance. Never leaves the balance negative.
    async fn apply_balance_delta(
        &self,
        account_id: AccountId,
        delta: Decimal,
        expected_balance: Decimal,
    ) -> Result<Decimal, StoreError>;

    /// All-or-nothing conditional write over several accounts.
    ///
    /// Implementations must acquire accounts in ascending [`AccountId`] order
    /// regardless of the order of `writes`, so that two batches touching the
    /// same pair in opposite directions cannot deadlock. New balances are
    /// returned in the order of `writes`.
    async fn apply_balance_deltas(
        &self,
        writes: Vec<BalanceWrite>,
    ) -> Result<Vec<Decimal>, StoreError>;

    /// Resolves a public account number to its account id.
    async fn resolve_account_number(
        &self,
        account_number: &AccountNumber,
    ) -> Result<AccountId, StoreError>;

    /// Lists the accounts a user owns, oldest first.
    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>, StoreError>;
}

/// Append-only store of money-movement records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Appends a single record.
    async fn append(&self, record: TransactionRecord) -> Result<TransactionId, StoreError>;

    /// Appends several records atomically: either all are stored or none.
    async fn append_all(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<Vec<TransactionId>, StoreError>;

    /// Reads an account's records, newest first.
    async fn query(
        &self,
        account_id: AccountId,
        query: TransactionQuery,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Loads one record.
    async fn get(&self, transaction_id: TransactionId) -> Result<TransactionRecord, StoreError>;
}

/// Per-account collection of investment holdings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HoldingBook: Send + Sync {
    /// Stores a newly purchased lot.
    async fn create(&self, holding: Holding) -> Result<HoldingId, StoreError>;

    /// Loads one holding.
    async fn get(&self, holding_id: HoldingId) -> Result<Holding, StoreError>;

    /// Removes shares from a holding.
    ///
    /// Fails with [`StoreError::InsufficientShares`] and leaves the holding
    /// untouched if it has fewer than `shares_to_remove`. Deletes the holding
    /// when it is exhausted. Returns the remaining share count.
    async fn reduce_or_close(
        &self,
        holding_id: HoldingId,
        shares_to_remove: Decimal,
    ) -> Result<Decimal, StoreError>;

    /// Lists an account's holdings, most recent purchase first.
    async fn list(&self, account_id: AccountId) -> Result<Vec<Holding>, StoreError>;

    /// Puts `shares` back on a holding, re-inserting `snapshot` if the
    /// holding was closed in the meantime. Used only to undo a sale.
    async fn restore(&self, snapshot: Holding, shares: Decimal) -> Result<Decimal, StoreError>;

    /// Records a new market price for a holding.
    async fn set_current_price(
        &self,
        holding_id: HoldingId,
        price: Decimal,
    ) -> Result<(), StoreError>;
}
