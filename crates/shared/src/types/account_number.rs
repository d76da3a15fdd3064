//! Externally addressable account numbers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_DIGITS: usize = 4;
const MAX_DIGITS: usize = 20;

/// Reasons an account number is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountNumberError {
    /// Length outside the accepted range.
    #[error("Account number must have between 4 and 20 digits, got {0}")]
    Length(usize),

    /// Contains something other than ASCII digits.
    #[error("Account number must contain only digits")]
    NonDigit,
}

/// The number a customer gives out to receive transfers.
///
/// Unlike [`AccountId`](super::AccountId) this value is public, so it is only
/// ever logged in masked form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parses and validates an account number.
    pub fn parse(raw: &str) -> Result<Self, AccountNumberError> {
        let trimmed = raw.trim();
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&trimmed.len()) {
            return Err(AccountNumberError::Length(trimmed.len()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountNumberError::NonDigit);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the raw digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masks everything but the last four digits, e.g. `xxxx-xxxx-xxxx-4821`.
    #[must_use]
    pub fn masked(&self) -> String {
        let last_four = &self.0[self.0.len() - MIN_DIGITS..];
        format!("xxxx-xxxx-xxxx-{last_four}")
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}
