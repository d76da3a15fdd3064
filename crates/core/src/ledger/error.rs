//! Ledger error types for validation, business-rule and storage failures.
//!
//! Validation and business-rule errors are raised before anything is
//! written. `Unavailable`, `Storage` and `CompensationFailed` may follow a
//! partial write; the engine reverses that write before returning them,
//! and `CompensationFailed` reports the case where the reversal itself failed.

use rust_decimal::Decimal;
use thiserror::Error;

use greatbank_shared::AppError;
use greatbank_shared::types::{AccountId, HoldingId, TransactionId};

use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount, share count or price is zero, negative, or so large that
    /// the resulting cost or balance cannot be represented.
    #[error("{field} must be positive and within range, got {value}")]
    InvalidAmount {
        /// Which input was rejected.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Instrument symbol is blank.
    #[error("Instrument symbol cannot be empty")]
    InvalidSymbol,

    /// Date range ends before it starts.
    #[error("Invalid date range: start is after end")]
    InvalidDateRange,

    /// Transfer source and destination are the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    // ========== Business Rule Errors ==========
    /// Balance does not cover the requested debit.
    #[error("Insufficient funds in account {account_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The account being debited.
        account_id: AccountId,
        /// Balance at the time of the check.
        available: Decimal,
        /// Amount the operation needed.
        requested: Decimal,
    },

    /// Holding does not have enough shares for the sale.
    #[error("Holding {holding_id} has {available} shares, cannot sell {requested}")]
    InsufficientShares {
        /// The holding being sold.
        holding_id: HoldingId,
        /// Shares currently held.
        available: Decimal,
        /// Shares the sale asked for.
        requested: Decimal,
    },

    // ========== Not Found Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Holding not found, or not owned by the requesting account.
    #[error("Holding not found: {0}")]
    HoldingNotFound(HoldingId),

    /// Transaction record not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transfer destination does not resolve to an account.
    #[error("Recipient account not found: {0}")]
    RecipientNotFound(String),

    // ========== Transient Errors ==========
    /// Conflicting concurrent writes outlasted the retry budget.
    #[error("Account is busy, gave up after {attempts} attempts")]
    Unavailable {
        /// Attempts made before giving up.
        attempts: u32,
    },

    // ========== Storage Errors ==========
    /// The underlying store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A partial write could not be reversed after a later step failed.
    #[error("{operation} failed ({cause}) and could not be reversed: {compensation}")]
    CompensationFailed {
        /// Engine operation that failed.
        operation: &'static str,
        /// The failure that triggered compensation.
        cause: String,
        /// Why the reversal failed.
        compensation: String,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidSymbol => "INVALID_SYMBOL",
            Self::InvalidDateRange => "INVALID_DATE_RANGE",
            Self::SameAccount(_) => "SAME_ACCOUNT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::HoldingNotFound(_) => "HOLDING_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::RecipientNotFound(_) => "RECIPIENT_NOT_FOUND",
            Self::Unavailable { .. } => "UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::CompensationFailed { .. } => "COMPENSATION_FAILED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount { .. }
            | Self::InvalidSymbol
            | Self::InvalidDateRange
            | Self::SameAccount(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_)
            | Self::HoldingNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::RecipientNotFound(_) => 404,

            // 422 Unprocessable - business rules
            Self::InsufficientFunds { .. } | Self::InsufficientShares { .. } => 422,

            // 503 Service Unavailable - retry exhaustion
            Self::Unavailable { .. } => 503,

            // 500 Internal Server Error
            Self::Storage(_) | Self::CompensationFailed { .. } => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns true if the error was raised before any write happened.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::Unavailable { .. } | Self::Storage(_) | Self::CompensationFailed { .. }
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => Self::AccountNotFound(id),
            StoreError::AccountNumberNotFound(number) => Self::RecipientNotFound(number),
            StoreError::HoldingNotFound(id) => Self::HoldingNotFound(id),
            StoreError::TransactionNotFound(id) => Self::TransactionNotFound(id),
            StoreError::InsufficientShares {
                holding_id,
                available,
                requested,
            } => Self::InsufficientShares {
                holding_id,
                available,
                requested,
            },
            StoreError::Overflow { delta, .. } => Self::InvalidAmount {
                field: "amount",
                value: delta.abs(),
            },
            // A conflict that escapes a retry loop is still transient.
            StoreError::Conflict { .. } => Self::Unavailable { attempts: 1 },
            other @ (StoreError::NegativeBalance { .. }
            | StoreError::Duplicate { .. }
            | StoreError::Backend(_)) => Self::Storage(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidSymbol
            | LedgerError::InvalidDateRange
            | LedgerError::SameAccount(_) => Self::Validation(message),
            LedgerError::InsufficientFunds { .. } | LedgerError::InsufficientShares { .. } => {
                Self::BusinessRule(message)
            }
            LedgerError::AccountNotFound(_)
            | LedgerError::HoldingNotFound(_)
            | LedgerError::TransactionNotFound(_)
            | LedgerError::RecipientNotFound(_) => Self::NotFound(message),
            LedgerError::Unavailable { .. } => Self::Unavailable(message),
            LedgerError::Storage(_) | LedgerError::CompensationFailed { .. } => {
                Self::Storage(message)
            }
        }
    }
}
