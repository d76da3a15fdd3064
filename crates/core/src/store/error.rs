//! Store error types.

use rust_decimal::Decimal;
use thiserror::Error;

use greatbank_shared::types::{AccountId, HoldingId, TransactionId};

/// Errors raised by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No account carries this number. Holds the masked number.
    #[error("No account with number {0}")]
    AccountNumberNotFound(String),

    /// Holding not found.
    #[error("Holding not found: {0}")]
    HoldingNotFound(HoldingId),

    /// Transaction record not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The stored balance no longer matches what the caller read.
    #[error("Balance conflict on account {account_id}: expected {expected}, found {actual}")]
    Conflict {
        /// The contended account.
        account_id: AccountId,
        /// Balance the writer expected.
        expected: Decimal,
        /// Balance actually stored.
        actual: Decimal,
    },

    /// The holding has fewer shares than the caller tried to remove.
    #[error("Holding {holding_id} has {available} shares, cannot remove {requested}")]
    InsufficientShares {
        /// The holding.
        holding_id: HoldingId,
        /// Shares currently held.
        available: Decimal,
        /// Shares the caller tried to remove.
        requested: Decimal,
    },

    /// The write would leave a balance below zero.
    #[error("Write would leave account {account_id} at {resulting}")]
    NegativeBalance {
        /// The account.
        account_id: AccountId,
        /// Balance the write would have produced.
        resulting: Decimal,
    },

    /// The write would take the balance outside the representable range.
    #[error("Adding {delta} to account {account_id} overflows its balance")]
    Overflow {
        /// The account.
        account_id: AccountId,
        /// The change that could not be applied.
        delta: Decimal,
    },

    /// A unique key already exists.
    #[error("Duplicate {entity}: {key}")]
    Duplicate {
        /// Entity type.
        entity: &'static str,
        /// The clashing key.
        key: String,
    },

    /// Backend fault (I/O, poisoned lock, lost connection).
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true for the optimistic-concurrency failure callers retry on.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
