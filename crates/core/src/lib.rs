//! Core business logic for GreatBank.
//!
//! This crate contains the ledger transaction engine and the domain types it
//! operates on. It has ZERO storage dependencies: persistence is reached only
//! through the traits in [`store`].
//!
//! # Modules
//!
//! - `account` - Cash accounts and their kinds
//! - `ledger` - Transaction records and the `LedgerEngine`
//! - `investment` - Holdings, valuation, portfolio summaries and price updates
//! - `store` - Store ports implemented by a persistence crate

pub mod account;
pub mod investment;
pub mod ledger;
pub mod store;

pub use account::{Account, AccountKind};
pub use investment::{Holding, InstrumentKind, PortfolioSummary, PriceQuote, PriceUpdater};
pub use ledger::{
    LedgerEngine, LedgerError, PurchaseReceipt, SaleReceipt, TransactionKind, TransactionQuery,
    TransactionRecord, TransferReceipt,
};
pub use store::{AccountStore, BalanceWrite, HoldingBook, StoreError, TransactionLog};
