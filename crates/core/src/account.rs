//! Cash accounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use greatbank_shared::types::{AccountId, AccountNumber, UserId};

/// The product an account was opened as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Everyday transactional account.
    Checking,
    /// Savings account.
    Savings,
    /// Cash account backing investment holdings.
    Investment,
}

impl AccountKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Investment => "investment",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "checking" => Some(Self::Checking),
            "savings" => Some(Self::Savings),
            "investment" => Some(Self::Investment),
            _ => None,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cash account.
///
/// `balance` is never negative at rest. Only the ledger engine changes it,
/// and only through a store's conditional write.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier.
    pub id: AccountId,
    /// Public number used as a transfer destination.
    pub account_number: AccountNumber,
    /// Owning user.
    pub owner_id: UserId,
    /// Account product.
    pub kind: AccountKind,
    /// Current cash balance.
    pub balance: Decimal,
    /// Credential hash managed by the authentication service. Opaque here.
    pub credential_hash: String,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account with a zero balance.
    #[must_use]
    pub fn new(
        owner_id: UserId,
        account_number: AccountNumber,
        kind: AccountKind,
        credential_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            account_number,
            owner_id,
            kind,
            balance: Decimal::ZERO,
            credential_hash: credential_hash.into(),
            created_at: Utc::now(),
        }
    }

    /// Sets the opening balance.
    #[must_use]
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }
}

// The credential hash stays out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("account_number", &self.account_number.masked())
            .field("owner_id", &self.owner_id)
            .field("kind", &self.kind)
            .field("balance", &self.balance)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
