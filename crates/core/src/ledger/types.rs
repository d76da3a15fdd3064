//! Ledger domain types.
//!
//! This module defines the append-only transaction record, the filters used
//! to read it back, and the receipts returned by engine operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use greatbank_shared::types::{AccountId, TransactionId};

use crate::investment::Holding;

/// Kind of money movement a record describes.
///
/// Records carry no sign. The direction is implied by the kind and, for
/// transfers and investments, by which leg or side the description names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Cash paid into an account.
    Deposit,
    /// Cash paid out of an account.
    Withdrawal,
    /// One leg of an account-to-account transfer.
    Transfer,
    /// Cash spent on or received from an investment holding.
    Investment,
}

impl TransactionKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Investment => "investment",
        }
    }

    /// Description used when the caller does not supply one.
    #[must_use]
    pub fn default_description(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Transfer => "Transfer",
            Self::Investment => "Investment",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable entry in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique, time-ordered identifier.
    pub id: TransactionId,
    /// Account whose cash moved.
    pub account_id: AccountId,
    /// What kind of movement this was.
    pub kind: TransactionKind,
    /// Magnitude of the movement. Always positive.
    pub amount: Decimal,
    /// Human-readable description.
    pub description: String,
    /// The counterpart leg of a transfer.
    pub reference_id: Option<TransactionId>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Creates a record stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            description: description.into(),
            reference_id: None,
            created_at: Utc::now(),
        }
    }

    /// Builds the debit and credit legs of a transfer.
    ///
    /// Both legs share a timestamp and reference each other, so either one
    /// leads to its counterpart.
    #[must_use]
    pub fn transfer_legs(
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        debit_description: String,
        credit_description: String,
    ) -> (Self, Self) {
        let created_at = Utc::now();
        let debit_id = TransactionId::new();
        let credit_id = TransactionId::new();

        let debit = Self {
            id: debit_id,
            account_id: from,
            kind: TransactionKind::Transfer,
            amount,
            description: debit_description,
            reference_id: Some(credit_id),
            created_at,
        };
        let credit = Self {
            id: credit_id,
            account_id: to,
            kind: TransactionKind::Transfer,
            amount,
            description: credit_description,
            reference_id: Some(debit_id),
            created_at,
        };
        (debit, credit)
    }
}

/// Filter for reading an account's ledger.
///
/// Bounds are inclusive. Results are ordered newest first and `limit` is
/// applied after ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Earliest creation time to include.
    pub from: Option<DateTime<Utc>>,
    /// Latest creation time to include.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

impl TransactionQuery {
    /// The `limit` most recent records.
    #[must_use]
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Every record created within `[from, to]`.
    #[must_use]
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            limit: None,
        }
    }

    /// Returns true if the record's timestamp falls inside the bounds.
    #[must_use]
    pub fn contains(&self, record: &TransactionRecord) -> bool {
        self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at <= to)
    }
}

/// Outcome of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Account the money was sent to.
    pub recipient_id: AccountId,
    /// Sender balance after the transfer.
    pub from_balance: Decimal,
    /// Recipient balance after the transfer.
    pub to_balance: Decimal,
    /// Record on the sender's ledger.
    pub debit_record_id: TransactionId,
    /// Record on the recipient's ledger.
    pub credit_record_id: TransactionId,
}

/// Outcome of a committed investment purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Cash balance after paying for the shares.
    pub new_balance: Decimal,
    /// The newly opened holding.
    pub holding: Holding,
    /// Ledger record for the purchase.
    pub record_id: TransactionId,
}

/// Outcome of a committed investment sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    /// Cash balance after receiving the proceeds.
    pub new_balance: Decimal,
    /// `shares_sold * selling_price`.
    pub proceeds: Decimal,
    /// Shares left on the holding. Zero means the holding was closed.
    pub remaining_shares: Decimal,
    /// Ledger record for the sale.
    pub record_id: TransactionId,
}
