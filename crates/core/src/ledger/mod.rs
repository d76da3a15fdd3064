//! Ledger transaction engine.
//!
//! This module implements the money-moving side of the bank:
//! - Transaction records and the queries that read them back
//! - The `LedgerEngine` and its five operations
//! - Conflict retry for conditional balance writes
//! - Error types for ledger operations

pub mod engine;
pub mod error;
pub mod retry;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::LedgerEngine;
pub use error::LedgerError;
pub use retry::RetryPolicy;
pub use types::{
    PurchaseReceipt, SaleReceipt, TransactionKind, TransactionQuery, TransactionRecord,
    TransferReceipt,
};
